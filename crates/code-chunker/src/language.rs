use crate::error::{ChunkerError, Result};
use std::path::Path;

/// Language detected from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Swift,
    Kotlin,
    Unknown,
}

/// Declarative splitting rules for one language.
///
/// `chunkable` node kinds each become a chunk; `context` kinds contribute a
/// breadcrumb component and are descended into; `transparent` kinds are
/// descended into without contributing anything (export wrappers and the
/// like); `imports` kinds are the nodes the import resolvers read.
#[derive(Debug, Clone, Copy)]
pub struct LanguageSpec {
    pub chunkable: &'static [&'static str],
    pub context: &'static [&'static str],
    pub transparent: &'static [&'static str],
    pub imports: &'static [&'static str],
}

const RUST_SPEC: LanguageSpec = LanguageSpec {
    chunkable: &[
        "function_item",
        "struct_item",
        "enum_item",
        "trait_item",
        "union_item",
        "const_item",
        "static_item",
        "type_item",
        "macro_definition",
    ],
    context: &["mod_item", "impl_item"],
    transparent: &["declaration_list"],
    imports: &["use_declaration"],
};

const PYTHON_SPEC: LanguageSpec = LanguageSpec {
    chunkable: &["function_definition", "decorated_definition"],
    context: &["class_definition"],
    transparent: &["block"],
    imports: &["import_statement", "import_from_statement"],
};

const JAVASCRIPT_SPEC: LanguageSpec = LanguageSpec {
    chunkable: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
    ],
    context: &["class_declaration"],
    transparent: &["export_statement", "class_body"],
    imports: &["import_statement"],
};

const TYPESCRIPT_SPEC: LanguageSpec = LanguageSpec {
    chunkable: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "function_signature",
        "interface_declaration",
        "enum_declaration",
        "type_alias_declaration",
    ],
    context: &[
        "class_declaration",
        "abstract_class_declaration",
        "internal_module",
        "module",
    ],
    transparent: &[
        "export_statement",
        "ambient_declaration",
        "class_body",
        "statement_block",
    ],
    imports: &["import_statement"],
};

const GO_SPEC: LanguageSpec = LanguageSpec {
    chunkable: &[
        "function_declaration",
        "method_declaration",
        "type_declaration",
        "const_declaration",
        "var_declaration",
    ],
    context: &[],
    transparent: &[],
    imports: &["import_declaration"],
};

const JAVA_SPEC: LanguageSpec = LanguageSpec {
    chunkable: &[
        "method_declaration",
        "constructor_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
        "annotation_type_declaration",
    ],
    context: &["class_declaration"],
    transparent: &["class_body"],
    imports: &["import_declaration"],
};

const C_SPEC: LanguageSpec = LanguageSpec {
    chunkable: &[
        "function_definition",
        "type_definition",
        "struct_specifier",
        "enum_specifier",
        "union_specifier",
    ],
    context: &[],
    transparent: &["declaration"],
    imports: &["preproc_include"],
};

const CPP_SPEC: LanguageSpec = LanguageSpec {
    chunkable: &[
        "function_definition",
        "type_definition",
        "struct_specifier",
        "enum_specifier",
        "union_specifier",
        "template_declaration",
    ],
    context: &["namespace_definition", "class_specifier"],
    transparent: &[
        "declaration",
        "linkage_specification",
        "declaration_list",
        "field_declaration_list",
    ],
    imports: &["preproc_include"],
};

const CSHARP_SPEC: LanguageSpec = LanguageSpec {
    chunkable: &[
        "method_declaration",
        "constructor_declaration",
        "property_declaration",
        "interface_declaration",
        "enum_declaration",
        "struct_declaration",
        "record_declaration",
        "delegate_declaration",
    ],
    context: &[
        "class_declaration",
        "namespace_declaration",
        "file_scoped_namespace_declaration",
    ],
    transparent: &["global_statement", "declaration_list"],
    imports: &["using_directive"],
};

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "rb" => Language::Ruby,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Unknown => "unknown",
        }
    }

    /// Check if this language has a syntax-tree splitter
    pub fn supports_syntax(self) -> bool {
        matches!(
            self,
            Language::Rust
                | Language::Python
                | Language::JavaScript
                | Language::TypeScript
                | Language::Go
                | Language::Java
                | Language::C
                | Language::Cpp
                | Language::CSharp
        )
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Language::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Ok(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Go => Ok(tree_sitter_go::LANGUAGE.into()),
            Language::Java => Ok(tree_sitter_java::LANGUAGE.into()),
            Language::C => Ok(tree_sitter_c::LANGUAGE.into()),
            Language::Cpp => Ok(tree_sitter_cpp::LANGUAGE.into()),
            Language::CSharp => Ok(tree_sitter_c_sharp::LANGUAGE.into()),
            _ => Err(ChunkerError::unsupported_language(self.as_str())),
        }
    }

    /// Get the splitting rules for this language
    pub fn spec(self) -> Result<&'static LanguageSpec> {
        match self {
            Language::Rust => Ok(&RUST_SPEC),
            Language::Python => Ok(&PYTHON_SPEC),
            Language::JavaScript => Ok(&JAVASCRIPT_SPEC),
            Language::TypeScript => Ok(&TYPESCRIPT_SPEC),
            Language::Go => Ok(&GO_SPEC),
            Language::Java => Ok(&JAVA_SPEC),
            Language::C => Ok(&C_SPEC),
            Language::Cpp => Ok(&CPP_SPEC),
            Language::CSharp => Ok(&CSHARP_SPEC),
            _ => Err(ChunkerError::unsupported_language(self.as_str())),
        }
    }
}

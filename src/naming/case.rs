//! Case conversion and Go reserved words.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Go keywords plus predeclared identifiers. Lower-case identifiers that match
/// any of these (case-insensitively) are escaped.
pub static GO_RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // keywords
        "break",
        "case",
        "chan",
        "const",
        "continue",
        "default",
        "defer",
        "else",
        "fallthrough",
        "for",
        "func",
        "go",
        "goto",
        "if",
        "import",
        "interface",
        "map",
        "package",
        "range",
        "return",
        "select",
        "struct",
        "switch",
        "type",
        "var",
        // predeclared
        "any",
        "append",
        "bool",
        "byte",
        "cap",
        "clear",
        "close",
        "comparable",
        "complex",
        "complex64",
        "complex128",
        "copy",
        "delete",
        "error",
        "false",
        "float32",
        "float64",
        "imag",
        "int",
        "int8",
        "int16",
        "int32",
        "int64",
        "iota",
        "len",
        "make",
        "max",
        "min",
        "new",
        "nil",
        "panic",
        "print",
        "println",
        "real",
        "recover",
        "rune",
        "string",
        "true",
        "uint",
        "uint8",
        "uint16",
        "uint32",
        "uint64",
        "uintptr",
    ]
    .into_iter()
    .collect()
});

/// Case-insensitive reserved-word check.
pub fn is_reserved_word(ident: &str) -> bool {
    GO_RESERVED_WORDS.contains(ident.to_lowercase().as_str())
}

/// Characters kept inside a word: letters and ASCII digits. Letter-like
/// numerals (`Ⅻ`), superscripts and other digit scripts separate words.
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_digit() || (c.is_alphabetic() && !c.is_numeric())
}

/// Split an arbitrary name into words.
///
/// Any character rejected by [`is_word_char`] separates words, and a lower-case
/// letter or digit followed by an upper-case letter starts a new word
/// (`petId` -> `pet`, `Id`). Runs of capitals stay together (`API`).
pub fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for c in name.chars() {
        if !is_word_char(c) {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }
        if let Some(p) = prev {
            if c.is_uppercase() && (p.is_lowercase() || p.is_ascii_digit()) && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
        prev = Some(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// `pet_id`, `petId`, `Pet-ID` -> `PetId`, `PetId`, `PetID`
pub fn to_pascal_case(name: &str) -> String {
    split_words(name).iter().map(|w| capitalize(w)).collect()
}

/// Like [`to_pascal_case`] but the first word is fully lower-cased.
pub fn to_camel_case(name: &str) -> String {
    let words = split_words(name);
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// Used for artifact names (`client_<group>`, `oauth2_<scheme>`).
pub fn to_snake_case(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Upper snake case for environment variable names.
pub fn to_screaming_snake_case(name: &str) -> String {
    to_snake_case(name).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("petId"), vec!["pet", "Id"]);
        assert_eq!(split_words("X-API-Key"), vec!["X", "API", "Key"]);
        assert_eq!(split_words("snake_case_name"), vec!["snake", "case", "name"]);
        assert_eq!(split_words("@id"), vec!["id"]);
        assert_eq!(split_words("v2Items"), vec!["v2", "Items"]);
        assert!(split_words("--").is_empty());
        assert_eq!(split_words("x²"), vec!["x"]);
        assert_eq!(split_words("Ⅻ"), Vec::<String>::new());
        assert_eq!(split_words("٣count"), vec!["count"]);
        assert_eq!(split_words("名前"), vec!["名前"]);
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("pet"), "Pet");
        assert_eq!(to_pascal_case("petId"), "PetId");
        assert_eq!(to_pascal_case("pet_id"), "PetId");
        assert_eq!(to_pascal_case("@id"), "Id");
        assert_eq!(to_pascal_case("X-API-Key"), "XAPIKey");
        assert_eq!(to_pascal_case("available"), "Available");
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("PetId"), "petId");
        assert_eq!(to_camel_case("pet_id"), "petId");
        assert_eq!(to_camel_case("TYPE"), "type");
        assert_eq!(to_camel_case("limit"), "limit");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("petstore_auth"), "petstore_auth");
        assert_eq!(to_snake_case("PetStore"), "pet_store");
        assert_eq!(to_screaming_snake_case("api-key"), "API_KEY");
    }

    #[test]
    fn test_reserved_words_case_insensitive() {
        assert!(is_reserved_word("type"));
        assert!(is_reserved_word("Type"));
        assert!(is_reserved_word("RANGE"));
        assert!(!is_reserved_word("pet"));
    }
}

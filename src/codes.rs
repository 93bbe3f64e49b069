//! Short catalog codes.
//!
//! Two shapes:
//! - categorized: `NAME(6)-CAT(4)-SUB(4)`, e.g. `CHEDDA-CHEE-HARD`
//! - named: first word of the name, up to 16 chars, e.g. `ACME`
//!
//! On collision the name part gets a numeric suffix `1..=99` that overwrites
//! its trailing characters, so the width never grows. Category and
//! subcategory parts are never touched.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

pub const MAX_CODE_LENGTH: usize = 16;
const NAME_LENGTH: usize = 6;
const CATEGORY_LENGTH: usize = 4;
const SUBCATEGORY_LENGTH: usize = 4;
const MAX_SUFFIX: u32 = 99;

/// Exact-match lookup against a catalog's `code` column.
#[async_trait]
pub trait CodeLookup: Send + Sync {
    async fn code_exists(&self, code: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy)]
pub enum CodeSource<'a> {
    Named {
        name: &'a str,
    },
    Categorized {
        name: &'a str,
        category: &'a str,
        subcategory: &'a str,
    },
}

/// Cleaned and truncated parts of a code, ready to render candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeParts {
    name: String,
    name_width: usize,
    tail: Option<(String, String)>,
}

impl<'a> CodeSource<'a> {
    pub fn parts(&self) -> Result<CodeParts> {
        match *self {
            CodeSource::Named { name } => Ok(CodeParts {
                name: clean("name", first_word(required("name", name)?), MAX_CODE_LENGTH)?,
                name_width: MAX_CODE_LENGTH,
                tail: None,
            }),
            CodeSource::Categorized {
                name,
                category,
                subcategory,
            } => {
                let name = required("name", name)?;
                let category = required("category", category)?;
                let subcategory = required("subcategory", subcategory)?;
                Ok(CodeParts {
                    name: clean("name", first_word(name), NAME_LENGTH)?,
                    name_width: NAME_LENGTH,
                    tail: Some((
                        clean("category", category, CATEGORY_LENGTH)?,
                        clean("subcategory", subcategory, SUBCATEGORY_LENGTH)?,
                    )),
                })
            }
        }
    }
}

impl CodeParts {
    pub fn base(&self) -> String {
        self.render(&self.name)
    }

    /// Base code followed by the 99 suffixed variants, in the order they are tried.
    pub fn candidates(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.base()).chain((1..=MAX_SUFFIX).map(move |i| {
            let suffix = i.to_string();
            let keep = self.name.len().min(self.name_width - suffix.len());
            self.render(&format!("{}{}", &self.name[..keep], suffix))
        }))
    }

    fn render(&self, name: &str) -> String {
        match &self.tail {
            Some((cat, sub)) => format!("{name}-{cat}-{sub}"),
            None => name.to_string(),
        }
    }
}

/// Picks the first candidate `exists` reports as free.
pub fn generate<F>(source: &CodeSource<'_>, mut exists: F) -> Result<String>
where
    F: FnMut(&str) -> bool,
{
    let parts = source.parts()?;
    for candidate in parts.candidates() {
        if !exists(&candidate) {
            return Ok(candidate);
        }
    }
    Err(Error::CodeSpaceExhausted { base: parts.base() })
}

/// Same as [`generate`], asking a catalog store for each candidate.
pub async fn generate_unique<L>(source: &CodeSource<'_>, lookup: &L) -> Result<String>
where
    L: CodeLookup + ?Sized,
{
    let parts = source.parts()?;
    for candidate in parts.candidates() {
        if !lookup.code_exists(&candidate).await? {
            debug!(code = %candidate, "generated code");
            return Ok(candidate);
        }
    }
    Err(Error::CodeSpaceExhausted { base: parts.base() })
}

/// Normalizes a client-supplied code to the shape generated codes have:
/// uppercase ASCII letters, digits and `-`, at most 16 characters.
pub fn normalize_supplied(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() > MAX_CODE_LENGTH {
        return Err(Error::invalid(
            "code",
            format!("must be at most {MAX_CODE_LENGTH} characters, got {}", code.len()),
        ));
    }
    if !code.chars().any(|c| c.is_ascii_alphanumeric())
        || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(Error::invalid(
            "code",
            format!("may only contain letters, digits and '-': {code:?}"),
        ));
    }
    Ok(code)
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid(field, "cannot be blank"));
    }
    Ok(trimmed)
}

fn first_word(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

fn clean(field: &'static str, text: &str, width: usize) -> Result<String> {
    let cleaned: String = text
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(width)
        .collect();
    if cleaned.is_empty() {
        return Err(Error::invalid(
            field,
            format!("must contain alphanumeric characters: {text:?}"),
        ));
    }
    Ok(cleaned)
}

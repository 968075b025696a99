//! Placeholder parsing and substitution for build command templates.
//!
//! Recipes describe their configure, build and install commands as templates.
//! Folder locations, settings and option values are only known once a build
//! has been keyed and laid out, so the templates reference them through
//! placeholders that are substituted right before a command runs.
//!
//! # Placeholder Formats
//!
//! - `$${source}`, `$${build}`, `$${generators}`, `$${package}` - build folders
//! - `$${toolchain}` - the generated toolchain file
//! - `$${setting:<name>}` - a setting (`os`, `compiler`, `build_type`, `arch`)
//! - `$${option:<name>}` - an effective option, rendered as `ON` or `OFF`
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so shell variables like
//! `$HOME` and `$PATH` work naturally without any escaping.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.
//!
//! # Example
//!
//! ```
//! use qtmd_lib::placeholder::{parse, Folder, Placeholder, Segment};
//!
//! let segments = parse("cmake --build $${build} -j$JOBS").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("cmake --build ".to_string()),
//!     Segment::Placeholder(Placeholder::Folder(Folder::Build)),
//!     Segment::Literal(" -j$JOBS".to_string()),
//! ]);
//! ```

use std::fmt;

use thiserror::Error;

/// A folder of the build layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
  Source,
  Build,
  Generators,
  Package,
  /// Not a folder but the toolchain file inside the generators folder.
  Toolchain,
}

impl fmt::Display for Folder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Folder::Source => "source",
      Folder::Build => "build",
      Folder::Generators => "generators",
      Folder::Package => "package",
      Folder::Toolchain => "toolchain",
    };
    f.write_str(name)
  }
}

/// A parsed placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
  Folder(Folder),
  Setting(String),
  Option(String),
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder type: {0}")]
  UnknownType(String),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("unknown setting '{0}'")]
  UnknownSetting(String),

  #[error("option '{0}' does not exist for this build")]
  UnresolvedOption(String),

  #[error("folder '{0}' is not available")]
  UnresolvedFolder(Folder),
}

/// Supplies values for placeholders.
pub trait Resolver {
  fn resolve_folder(&self, folder: Folder) -> Result<&str, PlaceholderError>;

  fn resolve_setting(&self, name: &str) -> Result<&str, PlaceholderError>;

  /// Resolve an option to its CMake spelling, `ON` or `OFF`.
  fn resolve_option(&self, name: &str) -> Result<&str, PlaceholderError>;
}

/// Parse a string containing placeholders into segments.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    if !matches!(chars.peek(), Some((_, '$'))) {
      // Lone $, shell variables pass through
      literal.push('$');
      continue;
    }
    chars.next();

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();
        if matches!(chars.peek(), Some((_, '{'))) {
          chars.next();
          literal.push_str("$${");
        } else {
          literal.push_str("$$$");
        }
      }
      Some((_, '{')) => {
        chars.next();

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut content = String::new();
        let mut closed = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            closed = true;
            break;
          }
          content.push(c);
        }

        if !closed {
          return Err(PlaceholderError::Unclosed(pos));
        }

        segments.push(Segment::Placeholder(parse_placeholder_content(&content)?));
      }
      _ => literal.push_str("$$"),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

fn parse_placeholder_content(content: &str) -> Result<Placeholder, PlaceholderError> {
  let folder = match content {
    "source" => Some(Folder::Source),
    "build" => Some(Folder::Build),
    "generators" => Some(Folder::Generators),
    "package" => Some(Folder::Package),
    "toolchain" => Some(Folder::Toolchain),
    _ => None,
  };
  if let Some(folder) = folder {
    return Ok(Placeholder::Folder(folder));
  }

  let (kind, name) = content
    .split_once(':')
    .ok_or_else(|| PlaceholderError::UnknownType(content.to_string()))?;

  if name.is_empty() {
    return Err(PlaceholderError::Malformed(format!("missing name in '{content}'")));
  }

  match kind {
    "setting" => Ok(Placeholder::Setting(name.to_string())),
    "option" => Ok(Placeholder::Option(name.to_string())),
    _ => Err(PlaceholderError::UnknownType(kind.to_string())),
  }
}

/// Parse `input` and substitute every placeholder using `resolver`.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(p) => {
        let value = match p {
          Placeholder::Folder(folder) => resolver.resolve_folder(*folder)?,
          Placeholder::Setting(name) => resolver.resolve_setting(name)?,
          Placeholder::Option(name) => resolver.resolve_option(name)?,
        };
        result.push_str(value);
      }
    }
  }

  Ok(result)
}

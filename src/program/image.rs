//! Program image loading.
//!
//! A program image is a sequence of signed decimal integers separated by
//! commas, with optional surrounding whitespace and no other framing. The
//! words land in memory at addresses `0..N-1` in order.

use crate::cpu::Word;
use std::path::Path;
use thiserror::Error;

/// Parse a program image from comma-separated text.
pub fn parse_image(source: &str) -> Result<Vec<Word>, ImageError> {
    let source = source.trim();
    if source.is_empty() {
        return Ok(Vec::new());
    }

    source
        .split(',')
        .enumerate()
        .map(|(index, token)| {
            let token = token.trim();
            token.parse::<Word>().map_err(|_| ImageError::Parse {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Load a program image from a file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<Word>, ImageError> {
    let source =
        std::fs::read_to_string(path.as_ref()).map_err(|e| ImageError::Io(e.to_string()))?;
    parse_image(&source)
}

/// Errors that can occur while loading a program image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("word {index} of the image is not a signed integer: {token:?}")]
    Parse { index: usize, token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_image() {
        assert_eq!(parse_image("1,9,10,3").unwrap(), vec![1, 9, 10, 3]);
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        assert_eq!(
            parse_image("  104, 1125899906842624 ,99\n").unwrap(),
            vec![104, 1_125_899_906_842_624, 99]
        );
    }

    #[test]
    fn test_parse_negative_words() {
        assert_eq!(parse_image("109,1,204,-1").unwrap(), vec![109, 1, 204, -1]);
    }

    #[test]
    fn test_parse_empty_source() {
        assert_eq!(parse_image("").unwrap(), Vec::<Word>::new());
        assert_eq!(parse_image("  \n").unwrap(), Vec::<Word>::new());
    }

    #[test]
    fn test_parse_rejects_non_integer() {
        let err = parse_image("1,two,3").unwrap_err();

        assert_eq!(
            err,
            ImageError::Parse {
                index: 1,
                token: "two".to_string()
            }
        );
    }
}

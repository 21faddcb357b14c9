use crate::error::ParseError;
use crate::models::{Line, TextRun, Token, TokenSource, Warning, WarningKind};

const FALLBACK_CHAR_WIDTH: f32 = 5.0;

/// Groups coordinate-tagged tokens into ordered lines.
///
/// Two tokens share a line when their y positions differ by at most the
/// profile's `y_tolerance`. Within a line tokens are sorted by `x0` and
/// joined with spacing re-derived from the x gap between them, so the
/// reconstructed text preserves the page's column alignment.
#[derive(Debug, Clone)]
pub struct LineReconstructor {
    y_tolerance: f32,
    x_tolerance: f32,
}

impl LineReconstructor {
    pub fn new(y_tolerance: f32, x_tolerance: f32) -> Self {
        Self {
            y_tolerance,
            x_tolerance,
        }
    }

    /// Consume the whole source and return the reconstructed lines.
    ///
    /// Tokens with unusable coordinates are dropped with a warning; a
    /// stream whose `(page_index, y)` ordering regresses beyond tolerance
    /// is rejected outright.
    pub fn reconstruct(
        &self,
        source: &mut dyn TokenSource,
    ) -> Result<(Vec<Line>, Vec<Warning>), ParseError> {
        let mut lines = Vec::new();
        let mut warnings = Vec::new();

        let mut band: Vec<Token> = Vec::new();
        let mut band_y = 0.0f32;
        let mut band_page = 0u32;
        let mut last_y = f32::NEG_INFINITY;
        let mut last_page: Option<u32> = None;

        while let Some(token) = source.next_token() {
            if !token.has_valid_coordinates() {
                warnings.push(
                    Warning::new(
                        WarningKind::InvalidToken,
                        format!("dropped token with invalid coordinates: {:?}", token.text),
                    )
                    .with_page(token.page_index),
                );
                continue;
            }

            match last_page {
                Some(page) if token.page_index < page => {
                    return Err(ParseError::StreamInvalid(format!(
                        "page index regressed from {page} to {}",
                        token.page_index
                    )));
                }
                Some(page) if token.page_index > page => {
                    last_y = f32::NEG_INFINITY;
                }
                Some(_) => {
                    if token.y < last_y - self.y_tolerance {
                        return Err(ParseError::StreamInvalid(format!(
                            "y position regressed from {last_y} to {} on page {}",
                            token.y, token.page_index
                        )));
                    }
                }
                None => {}
            }
            last_page = Some(token.page_index);
            last_y = last_y.max(token.y);

            let same_band = !band.is_empty()
                && token.page_index == band_page
                && (token.y - band_y).abs() <= self.y_tolerance;

            if !same_band {
                if !band.is_empty() {
                    lines.push(self.build_line(std::mem::take(&mut band), lines.len()));
                }
                band_y = token.y;
                band_page = token.page_index;
            }
            band.push(token);
        }

        if !band.is_empty() {
            lines.push(self.build_line(band, lines.len()));
        }

        tracing::debug!(lines = lines.len(), "Reconstructed statement lines");
        Ok((lines, warnings))
    }

    fn build_line(&self, mut tokens: Vec<Token>, index: usize) -> Line {
        tokens.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));

        let avg_char_width = average_char_width(&tokens);
        let page_index = tokens[0].page_index;
        let y = tokens[0].y;

        let mut text = String::new();
        let mut runs = Vec::with_capacity(tokens.len());
        let mut prev_x1: Option<f32> = None;

        for token in &tokens {
            if let Some(prev) = prev_x1 {
                let gap = token.x0 - prev;
                // Tokens separated by less than the x tolerance are one
                // visual run split by the extractor; rejoin them.
                if gap > self.x_tolerance {
                    let spaces = ((gap / avg_char_width).round() as i64).max(1) as usize;
                    text.extend(std::iter::repeat(' ').take(spaces));
                }
            }
            let byte_start = text.len();
            text.push_str(&token.text);
            runs.push(TextRun {
                byte_start,
                byte_end: text.len(),
                x0: token.x0,
                x1: token.x1,
            });
            prev_x1 = Some(token.x1);
        }

        Line {
            page_index,
            index,
            y,
            text,
            runs,
        }
    }
}

fn average_char_width(tokens: &[Token]) -> f32 {
    let total_width: f32 = tokens.iter().map(|t| t.x1 - t.x0).sum();
    let total_chars: usize = tokens.iter().map(|t| t.text.chars().count()).sum();
    if total_chars == 0 || total_width <= 0.0 {
        FALLBACK_CHAR_WIDTH
    } else {
        total_width / total_chars as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VecTokenSource;

    fn reconstruct(tokens: Vec<Token>) -> (Vec<Line>, Vec<Warning>) {
        let mut source = VecTokenSource::new(tokens);
        LineReconstructor::new(1.2, 0.5)
            .reconstruct(&mut source)
            .unwrap()
    }

    #[test]
    fn test_tokens_within_tolerance_share_a_line() {
        let (lines, _) = reconstruct(vec![
            Token::new("9th Jan", 0, 0.0, 20.0, 100.0),
            Token::new("Card payment", 0, 30.0, 70.0, 100.5),
            Token::new("12.00", 0, 80.0, 95.0, 99.8),
        ]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].text.starts_with("9th Jan"));
        assert!(lines[0].text.contains("12.00"));
    }

    #[test]
    fn test_band_split_beyond_tolerance() {
        let (lines, _) = reconstruct(vec![
            Token::new("first", 0, 0.0, 20.0, 100.0),
            Token::new("second", 0, 0.0, 20.0, 110.0),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[1].text, "second");
    }

    #[test]
    fn test_spacing_follows_gap_width() {
        // 10 units of gap at ~2.0 units/char inserts ~5 spaces.
        let (lines, _) = reconstruct(vec![
            Token::new("abcde", 0, 0.0, 10.0, 50.0),
            Token::new("fghij", 0, 20.0, 30.0, 50.0),
        ]);
        assert_eq!(lines[0].text, "abcde     fghij");
    }

    #[test]
    fn test_runs_map_back_to_page_coordinates() {
        let (lines, _) = reconstruct(vec![
            Token::new("desc", 0, 0.0, 8.0, 50.0),
            Token::new("10.39", 0, 90.0, 105.0, 50.0),
        ]);
        let line = &lines[0];
        let amount_start = line.text.find("10.39").unwrap();
        assert_eq!(line.x_at_end(amount_start + 5), Some(105.0));
    }

    #[test]
    fn test_invalid_token_dropped_with_warning() {
        let (lines, warnings) = reconstruct(vec![
            Token::new("good", 0, 0.0, 10.0, 50.0),
            Token::new("bad", 0, f32::NAN, 10.0, 50.0),
        ]);
        assert_eq!(lines.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::InvalidToken);
    }

    #[test]
    fn test_page_regression_is_fatal() {
        let mut source = VecTokenSource::new(vec![
            Token::new("a", 1, 0.0, 10.0, 50.0),
            Token::new("b", 0, 0.0, 10.0, 50.0),
        ]);
        let err = LineReconstructor::new(1.2, 0.5)
            .reconstruct(&mut source)
            .unwrap_err();
        assert!(matches!(err, ParseError::StreamInvalid(_)));
    }

    #[test]
    fn test_y_resets_on_new_page() {
        let (lines, _) = reconstruct(vec![
            Token::new("page one", 0, 0.0, 10.0, 700.0),
            Token::new("page two", 1, 0.0, 10.0, 50.0),
        ]);
        assert_eq!(lines.len(), 2);
    }
}

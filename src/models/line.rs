/// A contiguous run of token text within a reconstructed line.
///
/// `byte_start..byte_end` index into `Line::text`; `x0..x1` is the run's
/// horizontal extent on the page. Inserted inter-token spaces are not
/// covered by any run.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub byte_start: usize,
    pub byte_end: usize,
    pub x0: f32,
    pub x1: f32,
}

/// One reconstructed statement line: y-banded tokens joined left to right
/// with spacing re-derived from their x gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub page_index: u32,
    /// Zero-based index in stream order, stable across the whole statement.
    pub index: usize,
    /// Representative y of the band (first token's y).
    pub y: f32,
    pub text: String,
    pub runs: Vec<TextRun>,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The x coordinate where the text ending at byte offset `end`
    /// (exclusive) finishes on the page.
    ///
    /// Offsets inside a run are interpolated assuming uniform glyph width;
    /// offsets falling in inserted spacing resolve to the previous run's
    /// right edge. Returns `None` only for an offset before any run.
    pub fn x_at_end(&self, end: usize) -> Option<f32> {
        let mut last_before = None;
        for run in &self.runs {
            if end > run.byte_start && end <= run.byte_end {
                let len = (run.byte_end - run.byte_start) as f32;
                let frac = (end - run.byte_start) as f32 / len;
                return Some(run.x0 + frac * (run.x1 - run.x0));
            }
            if run.byte_end <= end {
                last_before = Some(run.x1);
            }
        }
        last_before
    }

    /// A derived line holding only the text from byte offset `start`
    /// onward, with run offsets rebased.
    ///
    /// Used when trailing text on a consumed line must be re-queued for
    /// classification as its own line.
    pub fn slice_from(&self, start: usize) -> Line {
        let runs = self
            .runs
            .iter()
            .filter(|run| run.byte_end > start)
            .map(|run| {
                let x0 = if run.byte_start >= start {
                    run.x0
                } else {
                    // Partial overlap: interpolate the cut point.
                    let len = (run.byte_end - run.byte_start) as f32;
                    let frac = (start - run.byte_start) as f32 / len;
                    run.x0 + frac * (run.x1 - run.x0)
                };
                TextRun {
                    byte_start: run.byte_start.saturating_sub(start),
                    byte_end: run.byte_end - start,
                    x0,
                    x1: run.x1,
                }
            })
            .collect();

        Line {
            page_index: self.page_index,
            index: self.index,
            y: self.y,
            text: self.text[start..].to_string(),
            runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_with_runs(text: &str, runs: Vec<TextRun>) -> Line {
        Line {
            page_index: 0,
            index: 0,
            y: 100.0,
            text: text.to_string(),
            runs,
        }
    }

    #[test]
    fn test_x_at_end_interpolates_within_run() {
        let line = line_with_runs(
            "1234",
            vec![TextRun {
                byte_start: 0,
                byte_end: 4,
                x0: 10.0,
                x1: 30.0,
            }],
        );
        assert_eq!(line.x_at_end(4), Some(30.0));
        assert_eq!(line.x_at_end(2), Some(20.0));
    }

    #[test]
    fn test_x_at_end_in_gap_uses_previous_run_edge() {
        let line = line_with_runs(
            "ab  cd",
            vec![
                TextRun {
                    byte_start: 0,
                    byte_end: 2,
                    x0: 0.0,
                    x1: 10.0,
                },
                TextRun {
                    byte_start: 4,
                    byte_end: 6,
                    x0: 20.0,
                    x1: 30.0,
                },
            ],
        );
        assert_eq!(line.x_at_end(3), Some(10.0));
        assert_eq!(line.x_at_end(6), Some(30.0));
    }

    #[test]
    fn test_slice_from_rebases_runs() {
        let line = line_with_runs(
            "4 extra",
            vec![
                TextRun {
                    byte_start: 0,
                    byte_end: 1,
                    x0: 0.0,
                    x1: 5.0,
                },
                TextRun {
                    byte_start: 2,
                    byte_end: 7,
                    x0: 10.0,
                    x1: 35.0,
                },
            ],
        );
        let rest = line.slice_from(2);
        assert_eq!(rest.text, "extra");
        assert_eq!(rest.runs.len(), 1);
        assert_eq!(rest.runs[0].byte_start, 0);
        assert_eq!(rest.runs[0].byte_end, 5);
    }
}

use serde::{Deserialize, Serialize};

/// A positioned text fragment extracted from one statement page.
///
/// Tokens arrive ordered by `(page_index, y, x0)`. Coordinates are in the
/// extractor's units (points for native text layers); the engine only ever
/// compares them, so the unit does not matter as long as it is consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub page_index: u32,
    /// Left edge of the rendered text.
    pub x0: f32,
    /// Right edge of the rendered text.
    pub x1: f32,
    /// Baseline y position.
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
}

impl Token {
    pub fn new(text: impl Into<String>, page_index: u32, x0: f32, x1: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            page_index,
            x0,
            x1,
            y,
            font_size: None,
        }
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    /// True when the coordinates are usable for layout reconstruction.
    pub fn has_valid_coordinates(&self) -> bool {
        self.x0.is_finite() && self.x1.is_finite() && self.y.is_finite() && self.x1 >= self.x0
    }
}

/// Abstract source of ordered tokens.
///
/// Implementations live outside the engine (native text-layer readers, OCR
/// adapters). The engine only pulls; end-of-stream is `None`.
pub trait TokenSource {
    fn next_token(&mut self) -> Option<Token>;
}

/// A `TokenSource` over an already-materialized token list.
///
/// Used by the CLI (JSON token dumps) and by tests.
#[derive(Debug)]
pub struct VecTokenSource {
    inner: std::vec::IntoIter<Token>,
}

impl VecTokenSource {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            inner: tokens.into_iter(),
        }
    }
}

impl TokenSource for VecTokenSource {
    fn next_token(&mut self) -> Option<Token> {
        self.inner.next()
    }
}

impl From<Vec<Token>> for VecTokenSource {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

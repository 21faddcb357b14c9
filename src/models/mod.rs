mod line;
mod statement;
mod token;
mod transaction;
mod warning;

pub use line::{Line, TextRun};
pub use statement::{Period, PrintedTotals, StatementResult};
pub use token::{Token, TokenSource, VecTokenSource};
pub use transaction::{score_confidence, Transaction, TransactionType};
pub use warning::{Warning, WarningKind};

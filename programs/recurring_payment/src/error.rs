use anchor_lang::prelude::*;

/// Error codes for the recurring payment program.
#[error_code]
#[derive(PartialEq, Eq)]
pub enum PaymentError {
    #[msg("Input is structurally invalid")]
    SchemaViolation,

    #[msg("Account is not a recurring payment contract")]
    NotAContract,

    #[msg("Caller is not allowed to perform this operation")]
    Unauthorized,

    #[msg("Contract state does not permit this operation")]
    InvalidState,

    #[msg("Installment index or revision is not the expected next value")]
    SequenceMismatch,

    #[msg("Balance too low for the requested transfer")]
    InsufficientFunds,

    #[msg("Prepaid minimum, installment cap or slot maturity violated")]
    ScheduleViolation,

    #[msg("A contract already exists at this address")]
    DuplicateContract,

    #[msg("Math overflow")]
    MathOverflow,

    #[msg("Ledger account could not be read or written")]
    LedgerUnavailable,

    #[msg("Invalid token mint")]
    InvalidTokenMint,

    #[msg("Invalid token account")]
    InvalidTokenAccount,
}

/// One rejected check of a transition: `(code, field, actual, expected)`,
/// tagged with the request that produced it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("request {request_id}: {code} at `{field}` (actual: {actual}, expected: {expected})")]
pub struct TransactionError {
    pub request_id: u64,
    pub code: PaymentError,
    pub field: String,
    pub actual: String,
    pub expected: String,
}

impl TransactionError {
    pub fn new(
        request_id: u64,
        code: PaymentError,
        field: impl Into<String>,
        actual: impl ToString,
        expected: impl ToString,
    ) -> Self {
        Self {
            request_id,
            code,
            field: field.into(),
            actual: actual.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Error raised by a pure component, where no field is implicated.
    pub fn from_code(request_id: u64, code: PaymentError) -> Self {
        Self::new(request_id, code, "", "", "")
    }
}

impl From<TransactionError> for anchor_lang::error::Error {
    fn from(e: TransactionError) -> Self {
        anchor_lang::error::Error::from(e.code).with_values((e.actual, e.expected))
    }
}

/// Result of a transition: all checks passed, or every failed check.
pub type TransitionResult = std::result::Result<(), Vec<TransactionError>>;

/// Collects failed checks so a transition can report all of them at once.
#[derive(Debug)]
pub struct Violations {
    request_id: u64,
    errors: Vec<TransactionError>,
}

impl Violations {
    pub fn new(request_id: u64) -> Self {
        Self {
            request_id,
            errors: Vec::new(),
        }
    }

    /// Record a violation unless `ok` holds.
    pub fn check(
        &mut self,
        ok: bool,
        code: PaymentError,
        field: &str,
        actual: impl ToString,
        expected: impl ToString,
    ) {
        if !ok {
            self.push(code, field, actual, expected);
        }
    }

    pub fn push(
        &mut self,
        code: PaymentError,
        field: &str,
        actual: impl ToString,
        expected: impl ToString,
    ) {
        self.errors
            .push(TransactionError::new(self.request_id, code, field, actual, expected));
    }

    /// `Ok(())` when nothing was recorded.
    pub fn finish(self) -> TransitionResult {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

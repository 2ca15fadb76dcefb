use crate::error::{EngineError, EngineResult};

/// Session-oriented interface to the external relational engine. All batched
/// execution runs through a single session, so implementations are free to
/// keep connection state behind `&mut self`.
pub trait ExecEngine {
    /// Runs a statement and returns the number of affected rows.
    fn execute(&mut self, sql: &str) -> EngineResult<u64>;

    /// Runs a query and returns its rows as strings.
    fn query(&mut self, sql: &str) -> EngineResult<Vec<Vec<String>>>;

    /// Applies a statement timeout to the session.
    fn set_timeout(&mut self, millis: u64) -> EngineResult<()>;

    /// Removes any statement timeout from the session.
    fn set_unbounded(&mut self) -> EngineResult<()>;

    /// Enables or disables the engine's own join reordering.
    fn set_join_reordering(&mut self, enabled: bool) -> EngineResult<()>;

    /// Switches the session between batch-friendly and general-purpose
    /// execution settings.
    fn set_batch_mode(&mut self, enabled: bool) -> EngineResult<()>;

    /// Runs `sql` under a timeout of `millis`, mapping an engine timeout to
    /// `Ok(false)`. The session timeout is reset afterwards in all cases.
    fn execute_or_timeout(&mut self, sql: &str, millis: u64) -> EngineResult<bool> {
        self.set_timeout(millis)?;
        let outcome = match self.execute(sql) {
            Ok(_) => Ok(true),
            Err(EngineError::Timeout) => Ok(false),
            Err(err) => Err(err),
        };
        self.set_unbounded()?;
        outcome
    }
}

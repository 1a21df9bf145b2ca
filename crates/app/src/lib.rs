//! Binary-only collaborators split into a library target so integration tests under `tests/`
//! can exercise `ReqwestExecutor` directly against a mocked agent (spec.md §13).

pub mod cli;
pub mod reqwest_executor;

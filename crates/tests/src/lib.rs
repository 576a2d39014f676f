//! Cross-crate integration tests: the mixer service driven against the
//! simulated session provider.

#[cfg(test)]
mod app_integration;
#[cfg(test)]
mod channel_integration;
#[cfg(test)]
mod persistence_integration;

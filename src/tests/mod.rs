//! Cross-module, end-to-end engine scenarios. Unit tests for a single
//! component live alongside that component; this module is for behavior that
//! only shows up once the whole pipeline — intake, processor loop, flush,
//! sink — is wired together.

mod scenarios;

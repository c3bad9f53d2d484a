//! Structured logging (C11): `tracing` initialization, generalized from
//! the teacher's bare `tracing_subscriber::fmt::init()` to honor
//! `RUST_LOG` via an env filter.

pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

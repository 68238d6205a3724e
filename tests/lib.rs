//! Postgres-backed end-to-end checks. Each test starts a throwaway
//! `postgres:16-alpine` container, so Docker must be reachable.

/*! Integration tests for `pathdb`.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * - scenarios: the concrete commit/abort/overwrite/array scenarios from
 *   the store's testable-properties list, exercised black-box through
 *   `Db`/`Transaction`/`View`.
 * - durability: round-trips through the `fjall`-backed engine across a
 *   process-boundary-style reopen.
 * - corruption: read-only-after-corruption behavior.
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pathdb=debug".parse().unwrap()))
        .with_test_writer()
        .try_init();
}

#[cfg(feature = "fjall")]
mod corruption;
#[cfg(feature = "fjall")]
mod durability;
mod scenarios;

use dotenvy::dotenv;
use std::sync::Once;

static INIT: Once = Once::new();

/// Loads `.env`, fills in fast test defaults and routes logs to the test
/// harness. Safe to call from every test.
pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        if std::env::var("WEREWOLF_START_DELAY_SECONDS").is_err() {
            std::env::set_var("WEREWOLF_START_DELAY_SECONDS", "0");
        }
        if std::env::var("WEREWOLF_VOTE_TIMEOUT_SECONDS").is_err() {
            std::env::set_var("WEREWOLF_VOTE_TIMEOUT_SECONDS", "0");
        }
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

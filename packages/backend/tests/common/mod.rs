use axum::Router;

pub fn create_test_app() -> Router {
    // A blank key leaves the vision client unconfigured, so generation
    // endpoints answer without touching the network.
    std::env::set_var("OPENAI_API_KEY", "");

    memelingo_backend::create_app()
}

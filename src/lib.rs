pub mod core {
    pub mod config;
    pub mod error;
    pub mod routes;
    pub mod startup;
    pub mod state;
    pub mod tracing_init;
}

pub mod models {
    pub mod api;
    pub mod feature;
    pub mod principal;
    pub mod subscription;
}

pub mod registry {
    pub mod feature_registry;
    pub mod role_table;
}

pub mod access {
    pub mod evaluator;
}

pub mod subscription {
    pub mod gate;
    pub mod loader;
    pub mod source;
}

pub mod guard {
    pub mod feature_access;
    pub mod route_gate;
    pub mod session;
}

pub mod handlers {
    pub mod access;
    pub mod fallback;
    pub mod features;
    pub mod health;
    pub mod metrics;
    pub mod session;
    pub mod subscription;
    pub mod views;
}

pub mod stores {
    pub mod session_store;
}

pub mod api {
    pub mod client;
}

pub mod metrics {
    pub mod collector;
}

pub mod utils {
    pub mod auth;
    pub mod time;
}

pub mod database;
pub mod endpoints;
pub mod error;
pub mod settings;
pub mod stream;

use std::sync::Arc;

use rocket::{Build, Rocket, routes};

use crate::database::LaneletStore;

/// Mount the lanelet routes on `rocket` and hand it the store they query.
pub fn mount(rocket: Rocket<Build>, store: Arc<dyn LaneletStore>) -> Rocket<Build> {
    rocket
        .mount(
            "/",
            routes![endpoints::lanelet_by_path, endpoints::lanelet_by_query],
        )
        .manage(store)
}

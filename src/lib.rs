#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod live;
pub mod logging;
pub mod mailer;
pub mod model;

use config::{ConfigFairing, DatabaseFairing, MailerFairing};
use live::UpdateNotifier;
use logging::LoggerFairing;

/// Build the rocket: load config, connect the database, build the SES
/// client, and mount every route.
pub async fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(MailerFairing)
        .manage(UpdateNotifier::new())
}

/// Get a database client for the configured URI (test version).
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri: String = rocket::Config::figment()
        .extract_inner("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to database")
}

/// Generate a random database name so concurrent tests never collide.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

/// Build a rocket against the given database and mailer, bypassing the
/// database and AWS fairings (test version).
#[cfg(test)]
pub(crate) async fn rocket_for_db_and_mailer(
    db_client: mongodb::Client,
    db_name: &str,
    mailer: aws_sdk_sesv2::Client,
) -> Rocket<Build> {
    let db = db_client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Failed to create indexes");

    let config: config::Config = rocket::Config::figment()
        .extract()
        .expect("Failed to load application config");
    let slate = config.slate().clone();

    rocket::build()
        .mount("/", api::routes())
        .manage(config)
        .manage(slate)
        .manage(db_client)
        .manage(db)
        .manage(mailer)
        .manage(UpdateNotifier::new())
}

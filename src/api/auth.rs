use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            admin::AdminCredentials,
            voter::{IdStatus, LoginRequest, VoterDesc},
        },
        auth::{AuthToken, AUTH_TOKEN_COOKIE},
        db::{
            admin::Admin,
            registry::RegistryEntry,
            voter::{NewVoter, Voter},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![authenticate_admin, id_status, login_voter, logout]
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn authenticate_admin(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<()> {
    let with_username = doc! {
        "username": &credentials.username,
    };

    let admin = admins
        .find_one(with_username, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::unauthorized(
                "No admin found with the provided username and password combination",
            )
        })?;

    let token = AuthToken::new(&admin);
    cookies.add(token.into_cookie(config));

    Ok(())
}

/// Report whether a unique ID could be used to register right now.
///
/// An ID that is absent from the registry or deactivated is invalid, and
/// its availability is not looked up.
#[get("/auth/voter/status?<unique_id>")]
pub async fn id_status(
    unique_id: String,
    registry: Coll<RegistryEntry>,
    voters: Coll<Voter>,
) -> Result<Json<IdStatus>> {
    let entry = registry
        .find_one(doc! { "unique_id": &unique_id }, None)
        .await?;

    let status = match entry {
        None => IdStatus::invalid("ID not found in the voter registry"),
        Some(entry) if !entry.is_active => IdStatus::invalid("ID has been deactivated"),
        Some(_) => {
            let used = voters
                .find_one(doc! { "unique_id": &unique_id }, None)
                .await?
                .is_some();
            if used {
                IdStatus::used("This ID has already been used")
            } else {
                IdStatus::available()
            }
        }
    };

    Ok(Json(status))
}

/// Log a voter in, registering them on first successful login.
///
/// Re-login with the same (email, ID) pair is idempotent and returns the
/// existing record. Eligibility is checked here and only here: deactivating
/// an ID later does not cut off an already-registered voter's session.
#[post("/auth/voter", data = "<request>", format = "json")]
pub async fn login_voter(
    request: Json<LoginRequest>,
    registry: Coll<RegistryEntry>,
    voters: Coll<Voter>,
    new_voters: Coll<NewVoter>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<Json<VoterDesc>> {
    let LoginRequest { email, unique_id } = request.0;

    let entry = registry
        .find_one(doc! { "unique_id": &unique_id }, None)
        .await?;
    match entry {
        None => return Err(Error::validation("ID not found in the voter registry")),
        Some(entry) if !entry.is_active => {
            return Err(Error::validation("ID has been deactivated"))
        }
        Some(_) => {}
    }

    let pair_filter = doc! {
        "email": email.clone(),
        "unique_id": &unique_id,
    };

    let voter = if let Some(voter) = voters.find_one(pair_filter.clone(), None).await? {
        voter
    } else {
        // First-write-wins: the unique index on `unique_id` decides the
        // winner of any concurrent registration race.
        let new_voter = NewVoter::new(email, unique_id);
        match new_voters.insert_one(&new_voter, None).await {
            Ok(result) => {
                let id: Id = result
                    .inserted_id
                    .as_object_id()
                    .unwrap() // Valid because the ID comes directly from the DB.
                    .into();
                voters.find_one(id.as_doc(), None).await?.unwrap()
            }
            Err(err) if is_duplicate_key_error(&err) => {
                // Someone else holds this ID. A racing login with the same
                // email adopts the winner's record; otherwise the ID is taken.
                voters
                    .find_one(pair_filter, None)
                    .await?
                    .ok_or_else(|| Error::conflict("This ID has already been used"))?
            }
            Err(err) => return Err(err.into()),
        }
    };

    let token = AuthToken::new(&voter);
    cookies.add(token.into_cookie(config));

    Ok(Json(voter.into()))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> rocket::http::Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    rocket::http::Status::Ok
}

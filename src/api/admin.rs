use std::collections::HashMap;

use mongodb::{bson::doc, options::FindOptions, Client};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    live::UpdateNotifier,
    model::{
        api::admin::{
            AdminCredentials, NewRegistryEntryRequest, SetActiveRequest, VoterReport,
        },
        auth::AuthToken,
        db::{
            admin::{Admin, NewAdmin},
            registry::{NewRegistryEntry, RegistryEntry, RegistryEntryCore},
            vote::Vote,
            voter::Voter,
        },
        mongodb::{is_duplicate_key_error, Coll},
    },
};

use super::common::commit_with_retry;

pub fn routes() -> Vec<Route> {
    routes![
        list_registry,
        add_registry_entry,
        set_registry_active,
        voter_report,
        reset_all_votes,
        delete_voter_votes,
        delete_voter_account,
        get_admins,
        create_admin,
        delete_admin,
    ]
}

/// All issued unique IDs, ordered by ID.
#[get("/admin/registry")]
async fn list_registry(
    _token: AuthToken<Admin>,
    registry: Coll<RegistryEntry>,
) -> Result<Json<Vec<RegistryEntryCore>>> {
    let by_unique_id = FindOptions::builder()
        .sort(doc! { "unique_id": 1 })
        .build();
    let entries: Vec<RegistryEntry> = registry
        .find(None, by_unique_id)
        .await?
        .try_collect()
        .await?;
    Ok(Json(entries.into_iter().map(|e| e.entry).collect()))
}

/// Issue a new unique voter ID.
#[post("/admin/registry", data = "<request>", format = "json")]
async fn add_registry_entry(
    _token: AuthToken<Admin>,
    request: Json<NewRegistryEntryRequest>,
    registry: Coll<NewRegistryEntry>,
) -> Result<()> {
    if request.unique_id.trim().is_empty() {
        return Err(Error::validation("Unique ID must not be empty"));
    }

    let entry: NewRegistryEntry = request.0.into();
    match registry.insert_one(&entry, None).await {
        Ok(_) => Ok(()),
        Err(err) if is_duplicate_key_error(&err) => Err(Error::conflict(format!(
            "ID already in the registry: {}",
            entry.unique_id
        ))),
        Err(err) => Err(err.into()),
    }
}

/// Activate or deactivate a unique ID.
///
/// Deactivation blocks new registration only; it does not touch existing
/// voter records or their votes, and an already-logged-in voter can still
/// submit.
#[patch("/admin/registry/<unique_id>", data = "<request>", format = "json")]
async fn set_registry_active(
    _token: AuthToken<Admin>,
    unique_id: String,
    request: Json<SetActiveRequest>,
    registry: Coll<RegistryEntry>,
) -> Result<()> {
    let update = doc! { "$set": { "is_active": request.is_active } };
    let result = registry
        .update_one(doc! { "unique_id": &unique_id }, update, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Registry entry {unique_id}")));
    }
    Ok(())
}

/// Per registry entry: whether anyone registered with it, and whether they
/// have voted. Ordered by unique ID.
#[get("/admin/voters")]
async fn voter_report(
    _token: AuthToken<Admin>,
    registry: Coll<RegistryEntry>,
    voters: Coll<Voter>,
) -> Result<Json<Vec<VoterReport>>> {
    let by_unique_id = FindOptions::builder()
        .sort(doc! { "unique_id": 1 })
        .build();
    let entries: Vec<RegistryEntry> = registry
        .find(None, by_unique_id)
        .await?
        .try_collect()
        .await?;

    let mut registered: HashMap<String, Voter> = voters
        .find(None, None)
        .await?
        .map_ok(|voter| (voter.unique_id.clone(), voter))
        .try_collect()
        .await?;

    let report = entries
        .into_iter()
        .map(|entry| {
            let voter = registered.remove(&entry.unique_id);
            VoterReport {
                unique_id: entry.entry.unique_id,
                voter_name: entry.entry.voter_name,
                is_active: entry.entry.is_active,
                registered: voter.is_some(),
                email: voter.as_ref().map(|v| v.email.clone()),
                has_voted: voter.map(|v| v.has_voted).unwrap_or(false),
            }
        })
        .collect();

    Ok(Json(report))
}

/// Delete every vote and reset every voter's `has_voted` flag, as one
/// transaction. Destructive and unscoped; the caller has already passed the
/// admin gate.
#[post("/admin/votes/reset")]
async fn reset_all_votes(
    _token: AuthToken<Admin>,
    voters: Coll<Voter>,
    votes: Coll<Vote>,
    notifier: &State<UpdateNotifier>,
    db_client: &State<Client>,
) -> Result<()> {
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;
        votes
            .delete_many_with_session(doc! {}, None, &mut session)
            .await?;
        voters
            .update_many_with_session(
                doc! {},
                doc! { "$set": { "has_voted": false } },
                None,
                &mut session,
            )
            .await?;
        commit_with_retry(&mut session).await?;
    }

    warn!("Admin action: all votes deleted, every voter reset");
    notifier.notify();
    Ok(())
}

/// Delete one voter's votes and reset their flag, keeping the voter record
/// (and their claim on the unique ID) intact.
#[delete("/admin/voters/<unique_id>/votes")]
async fn delete_voter_votes(
    _token: AuthToken<Admin>,
    unique_id: String,
    voters: Coll<Voter>,
    votes: Coll<Vote>,
    notifier: &State<UpdateNotifier>,
    db_client: &State<Client>,
) -> Result<()> {
    let voter = voters
        .find_one(doc! { "unique_id": &unique_id }, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter with ID {unique_id}")))?;

    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;
        votes
            .delete_many_with_session(doc! { "voter_id": voter.id }, None, &mut session)
            .await?;
        voters
            .update_one_with_session(
                voter.id.as_doc(),
                doc! { "$set": { "has_voted": false } },
                None,
                &mut session,
            )
            .await?;
        commit_with_retry(&mut session).await?;
    }

    warn!("Admin action: votes deleted for ID {unique_id}");
    notifier.notify();
    Ok(())
}

/// Delete one voter's votes and their record entirely, freeing the unique
/// ID for re-registration. The registry entry is untouched.
#[delete("/admin/voters/<unique_id>")]
async fn delete_voter_account(
    _token: AuthToken<Admin>,
    unique_id: String,
    voters: Coll<Voter>,
    votes: Coll<Vote>,
    notifier: &State<UpdateNotifier>,
    db_client: &State<Client>,
) -> Result<()> {
    let voter = voters
        .find_one(doc! { "unique_id": &unique_id }, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter with ID {unique_id}")))?;

    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;
        votes
            .delete_many_with_session(doc! { "voter_id": voter.id }, None, &mut session)
            .await?;
        voters
            .delete_one_with_session(voter.id.as_doc(), None, &mut session)
            .await?;
        commit_with_retry(&mut session).await?;
    }

    warn!("Admin action: account and votes deleted for ID {unique_id}");
    notifier.notify();
    Ok(())
}

#[get("/admins")]
async fn get_admins(_token: AuthToken<Admin>, admins: Coll<Admin>) -> Result<Json<Vec<String>>> {
    let admin_list: Vec<Admin> = admins.find(None, None).await?.try_collect().await?;
    let admin_names = admin_list
        .into_iter()
        .map(|admin| admin.admin.username)
        .collect();
    Ok(Json(admin_names))
}

#[post("/admins", data = "<new_admin>", format = "json")]
async fn create_admin(
    _token: AuthToken<Admin>,
    new_admin: Json<AdminCredentials>,
    admins: Coll<NewAdmin>,
) -> Result<()> {
    let admin: NewAdmin = new_admin
        .0
        .try_into()
        .map_err(|_| Error::validation("Illegal admin credentials"))?;

    match admins.insert_one(&admin, None).await {
        Ok(_) => Ok(()),
        Err(err) if is_duplicate_key_error(&err) => Err(Error::conflict(format!(
            "Admin username already in use: {}",
            admin.username
        ))),
        Err(err) => Err(err.into()),
    }
}

#[delete("/admins", data = "<username>", format = "json")]
async fn delete_admin(
    _token: AuthToken<Admin>,
    username: Json<String>,
    admins: Coll<Admin>,
) -> Result<()> {
    // Prevent deleting the last admin.
    let count = admins.count_documents(None, None).await?;
    if count == 1 {
        return Err(Error::conflict("Cannot delete the last admin"));
    }

    let result = admins
        .delete_one(doc! { "username": &username.0 }, None)
        .await?;
    if result.deleted_count == 0 {
        Err(Error::not_found(format!("Admin {}", username.0)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{serde_json, serde_json::json},
    };

    use crate::model::{
        api::voter::IdStatus,
        common::slate::Slate,
        db::{
            admin::DEFAULT_ADMIN_USERNAME,
            vote::NewVote,
            voter::{NewVoter, VoterCore},
        },
        mongodb::Id,
    };

    use super::*;

    /// Seed a registered voter with a full ballot directly in the database.
    async fn seed_voted_voter(db: &Database, voter: NewVoter) -> Id {
        let slate_voter = Voter {
            id: Id::new(),
            voter: VoterCore {
                has_voted: true,
                ..voter
            },
        };
        let voter_id = slate_voter.id;
        Coll::<Voter>::from_db(db)
            .insert_one(&slate_voter, None)
            .await
            .unwrap();

        let slate = Slate::example();
        let ledger = slate
            .positions()
            .iter()
            .map(|p| NewVote::new(voter_id, p.id.clone(), p.candidates[0].id.clone()))
            .collect::<Vec<_>>();
        Coll::<NewVote>::from_db(db)
            .insert_many(ledger, None)
            .await
            .unwrap();

        voter_id
    }

    #[backend_test(admin)]
    async fn issue_and_toggle_registry_entry(client: Client, registry: Coll<RegistryEntry>) {
        let request = NewRegistryEntryRequest {
            unique_id: "NA-2024-0042".to_string(),
            voter_name: Some("Ngozi Ibe".to_string()),
            issued_by: Some("electoral committee".to_string()),
            notes: None,
        };
        let response = client
            .post(uri!(add_registry_entry))
            .header(ContentType::JSON)
            .body(json!(request).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let entry = registry
            .find_one(doc! { "unique_id": "NA-2024-0042" }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(entry.is_active);
        assert_eq!(Some("Ngozi Ibe".to_string()), entry.entry.voter_name);

        // Deactivate.
        let response = client
            .patch(uri!(set_registry_active("NA-2024-0042")))
            .header(ContentType::JSON)
            .body(json!(SetActiveRequest { is_active: false }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let entry = registry
            .find_one(doc! { "unique_id": "NA-2024-0042" }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(!entry.is_active);

        // Reactivate.
        let response = client
            .patch(uri!(set_registry_active("NA-2024-0042")))
            .header(ContentType::JSON)
            .body(json!(SetActiveRequest { is_active: true }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let entry = registry
            .find_one(doc! { "unique_id": "NA-2024-0042" }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(entry.is_active);
    }

    #[backend_test(admin)]
    async fn duplicate_registry_entry_is_a_conflict(client: Client, registry: Coll<NewRegistryEntry>) {
        registry
            .insert_one(NewRegistryEntry::example(), None)
            .await
            .unwrap();

        let request = NewRegistryEntryRequest {
            unique_id: NewRegistryEntry::example().unique_id,
            voter_name: None,
            issued_by: None,
            notes: None,
        };
        let response = client
            .post(uri!(add_registry_entry))
            .header(ContentType::JSON)
            .body(json!(request).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
    }

    #[backend_test(admin)]
    async fn toggling_missing_entry_is_not_found(client: Client) {
        let response = client
            .patch(uri!(set_registry_active("NOT-A-REAL-ID")))
            .header(ContentType::JSON)
            .body(json!(SetActiveRequest { is_active: false }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn voter_report_joins_registration(client: Client, db: Database) {
        let registry = Coll::<NewRegistryEntry>::from_db(&db);
        registry
            .insert_one(NewRegistryEntry::example(), None)
            .await
            .unwrap();
        registry
            .insert_one(NewRegistryEntry::example2(), None)
            .await
            .unwrap();
        // Only the first ID has registered and voted.
        seed_voted_voter(&db, VoterCore::example()).await;

        let response = client.get(uri!(voter_report)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let report: Vec<VoterReport> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(2, report.len());

        assert_eq!(NewRegistryEntry::example().unique_id, report[0].unique_id);
        assert!(report[0].registered);
        assert!(report[0].has_voted);
        assert_eq!(
            Some(VoterCore::example().email),
            report[0].email.clone()
        );

        assert_eq!(NewRegistryEntry::example2().unique_id, report[1].unique_id);
        assert!(!report[1].registered);
        assert!(!report[1].has_voted);
        assert_eq!(None, report[1].email);
    }

    #[backend_test(admin)]
    async fn reset_clears_ledger_and_flags(client: Client, db: Database) {
        seed_voted_voter(&db, VoterCore::example()).await;
        seed_voted_voter(&db, VoterCore::example2()).await;

        let response = client.post(uri!(reset_all_votes)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let votes = Coll::<Vote>::from_db(&db);
        assert_eq!(0, votes.count_documents(None, None).await.unwrap());

        let voters: Vec<Voter> = Coll::<Voter>::from_db(&db)
            .find(None, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(2, voters.len());
        assert!(voters.iter().all(|v| !v.has_voted));
    }

    #[backend_test(admin)]
    async fn vote_deletion_is_scoped_to_one_voter(client: Client, db: Database) {
        let first = seed_voted_voter(&db, VoterCore::example()).await;
        let second = seed_voted_voter(&db, VoterCore::example2()).await;

        let response = client
            .delete(uri!(delete_voter_votes(VoterCore::example().unique_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let votes = Coll::<Vote>::from_db(&db);
        assert_eq!(
            0,
            votes
                .count_documents(doc! { "voter_id": first }, None)
                .await
                .unwrap()
        );
        // The other voter's ledger rows are untouched.
        assert_eq!(
            Slate::example().positions().len() as u64,
            votes
                .count_documents(doc! { "voter_id": second }, None)
                .await
                .unwrap()
        );

        // The voter record survives with its flag reset.
        let voter = Coll::<Voter>::from_db(&db)
            .find_one(doc! { "unique_id": VoterCore::example().unique_id }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(!voter.has_voted);
    }

    #[backend_test(admin)]
    async fn account_deletion_frees_the_unique_id(client: Client, db: Database) {
        Coll::<NewRegistryEntry>::from_db(&db)
            .insert_one(NewRegistryEntry::example(), None)
            .await
            .unwrap();
        let voter_id = seed_voted_voter(&db, VoterCore::example()).await;

        let response = client
            .delete(uri!(delete_voter_account(VoterCore::example().unique_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // Votes and record are gone.
        let votes = Coll::<Vote>::from_db(&db);
        assert_eq!(
            0,
            votes
                .count_documents(doc! { "voter_id": voter_id }, None)
                .await
                .unwrap()
        );
        let voter = Coll::<Voter>::from_db(&db)
            .find_one(doc! { "unique_id": VoterCore::example().unique_id }, None)
            .await
            .unwrap();
        assert!(voter.is_none());

        // The ID may be used to register again.
        let response = client
            .get(uri!(crate::api::auth::id_status(
                VoterCore::example().unique_id
            )))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let status: IdStatus =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(IdStatus::available(), status);
    }

    #[backend_test(admin)]
    async fn deleting_missing_voter_is_not_found(client: Client) {
        let response = client
            .delete(uri!(delete_voter_account("NOT-A-REAL-ID")))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        let response = client
            .delete(uri!(delete_voter_votes("NOT-A-REAL-ID")))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn admin_routes_require_the_gate(client: Client, db: Database) {
        seed_voted_voter(&db, VoterCore::example()).await;

        // No admin token: no matching route.
        let response = client.get(uri!(voter_report)).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let response = client.post(uri!(reset_all_votes)).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let response = client
            .delete(uri!(delete_voter_account(VoterCore::example().unique_id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        // Nothing was touched.
        let votes = Coll::<Vote>::from_db(&db);
        assert_ne!(0, votes.count_documents(None, None).await.unwrap());
    }

    #[backend_test(admin)]
    async fn create_delete_admin(client: Client, admins: Coll<Admin>) {
        // Create a second admin.
        let response = client
            .post(uri!(create_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example2()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let count = admins.count_documents(None, None).await.unwrap();
        assert_eq!(2, count); // Test admin, new admin.

        // Delete it again.
        let response = client
            .delete(uri!(delete_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example2().username).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let count = admins.count_documents(None, None).await.unwrap();
        assert_eq!(1, count);
    }

    #[backend_test(admin)]
    async fn bad_create_admin(client: Client, admins: Coll<Admin>) {
        // Empty username.
        let response = client
            .post(uri!(create_admin))
            .header(ContentType::JSON)
            .body(
                json!(AdminCredentials {
                    username: "".to_string(),
                    password: "long-enough-password".to_string(),
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        // Short password.
        let response = client
            .post(uri!(create_admin))
            .header(ContentType::JSON)
            .body(
                json!(AdminCredentials {
                    username: "shortly".to_string(),
                    password: "short".to_string(),
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        // Duplicate username.
        let response = client
            .post(uri!(create_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example1()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        // Only the test admin remains.
        let count = admins.count_documents(None, None).await.unwrap();
        assert_eq!(1, count);
    }

    #[backend_test(admin)]
    async fn cannot_delete_last_admin(client: Client, admins: Coll<Admin>) {
        let response = client
            .delete(uri!(delete_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example1().username).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        let count = admins.count_documents(None, None).await.unwrap();
        assert_eq!(1, count);
    }

    #[backend_test(admin)]
    async fn list_admins(client: Client) {
        let response = client.get(uri!(get_admins)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let names: Vec<String> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(vec![AdminCredentials::example1().username], names);

        // The default admin username is reserved for first launch and is not
        // present in test databases.
        assert!(!names.contains(&DEFAULT_ADMIN_USERNAME.to_string()));
    }
}

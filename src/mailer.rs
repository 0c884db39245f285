//! Outbound email for submitted ballots.
//!
//! Dispatch is fire-and-forget and entirely decoupled from the transaction
//! that records the votes: the authoritative outcome is already committed
//! by the time anything here runs, and failures are logged and swallowed.

use aws_sdk_sesv2::Client as SesClient;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::model::common::ballot::BallotPaper;
use crate::model::common::slate::Slate;
use crate::model::db::voter::Voter;

/// Dispatch the post-commit emails for a submitted ballot: a confirmation
/// to the voter and a summary to the admin inbox.
///
/// The message bodies are rendered up front; the sends run on a spawned
/// task and never report back to the caller.
pub fn dispatch_vote_emails(
    mailer: SesClient,
    config: &Config,
    slate: &Slate,
    voter: &Voter,
    ballot: &BallotPaper,
    submitted_at: DateTime<Utc>,
) {
    let sender = config.sender_address().to_string();
    let admin = config.admin_address().to_string();
    let voter_address = voter.email.to_string();
    let unique_id = voter.unique_id.clone();

    let choices = render_choices(slate, ballot);
    let timestamp = submitted_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();

    let confirmation_subject = "Your vote has been recorded".to_string();
    let confirmation = format!(
        "Thank you for voting.\n\nYour ballot was recorded at {timestamp}.\n\n{choices}\n"
    );
    let summary_subject = format!("Ballot received from ID {unique_id}");
    let summary = format!("Voter ID {unique_id} submitted a ballot at {timestamp}.\n\n{choices}\n");

    // No outbound email from tests.
    #[cfg(test)]
    {
        let _ = (
            mailer,
            sender,
            admin,
            voter_address,
            confirmation_subject,
            confirmation,
            summary_subject,
            summary,
        );
        debug!("Suppressing outbound email in tests");
    }

    #[cfg(not(test))]
    {
        rocket::tokio::spawn(async move {
            if let Err(err) = send_plain(
                &mailer,
                &sender,
                &voter_address,
                &confirmation_subject,
                &confirmation,
            )
            .await
            {
                warn!("Failed to send vote confirmation to {voter_address}: {err}");
            }
            if let Err(err) =
                send_plain(&mailer, &sender, &admin, &summary_subject, &summary).await
            {
                warn!("Failed to send ballot summary to {admin}: {err}");
            }
        });
    }
}

/// One line per slate position, in ballot order, naming the chosen candidate.
fn render_choices(slate: &Slate, ballot: &BallotPaper) -> String {
    let mut lines = Vec::with_capacity(slate.positions().len());
    for position in slate.positions() {
        if let Some(candidate_id) = ballot.get(&position.id) {
            let name = position
                .candidate(candidate_id)
                .map(|c| c.name.as_str())
                .unwrap_or(candidate_id.as_str());
            lines.push(format!("{}: {}", position.title, name));
        }
    }
    lines.join("\n")
}

#[cfg(not(test))]
async fn send_plain(
    mailer: &SesClient,
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<(), aws_sdk_sesv2::types::SdkError<aws_sdk_sesv2::error::SendEmailError>> {
    use aws_sdk_sesv2::model::{Body, Content, Destination, EmailContent, Message};

    let destination = Destination::builder().to_addresses(to).build();
    let content = EmailContent::builder()
        .simple(
            Message::builder()
                .subject(Content::builder().data(subject).build())
                .body(Body::builder().text(Content::builder().data(body).build()).build())
                .build(),
        )
        .build();
    mailer
        .send_email()
        .from_email_address(from)
        .destination(destination)
        .content(content)
        .send()
        .await?;
    Ok(())
}

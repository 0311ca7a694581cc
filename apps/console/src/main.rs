use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use interview_session::{format_remaining, urgency, InterviewController};
use media_capture::LoopbackMediaDevices;
use questionnaire::{
    score, AnswerInput, QuestionnaireEngine, SimulatedSubmissionSink,
};
use routing::{Navigator, RouteGuard};
use session_store::{SessionStore, SimulatedCredentialBackend};
use shared::domain::{InterviewId, Question};
use storage::SqliteKeyValueStore;
use tracing::{error, info, warn};
use validation::{login_rules, validate_form};

mod catalog;
mod settings;

use catalog::sample_questions;
use settings::load_settings;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "jordan@example.com")]
    email: String,
    #[arg(long, default_value = "Abcdef1!")]
    password: String,
    /// Interview to open after signing in.
    #[arg(long, default_value = "demo-interview")]
    interview_id: String,
    /// Override the live session length in seconds.
    #[arg(long)]
    session_length: Option<u64>,
}

struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn redirect(&self, path: &str) {
        info!(path, "redirect requested");
    }

    fn back(&self) {
        info!("back navigation requested");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let settings = load_settings();

    let persistence = Arc::new(
        SqliteKeyValueStore::new(&settings.database_url)
            .await
            .map_err(|error| {
                error!(
                    database_url = settings.database_url.as_str(),
                    %error,
                    "failed to open the session database"
                );
                error
            })?,
    );
    let navigator = Arc::new(LoggingNavigator);
    let store = SessionStore::with_backend(
        persistence,
        navigator,
        Arc::new(SimulatedCredentialBackend::with_round_trip(
            Duration::from_millis(settings.login_round_trip_ms),
        )),
    );
    let guard = RouteGuard::new(settings.route_config());

    // restore must settle before the first guard decision
    let state = store.restore().await;
    let interview_path = format!("/interview/{}", args.interview_id);
    info!(
        path = interview_path.as_str(),
        decision = ?guard.decide(&interview_path, &state),
        "pre-login navigation"
    );

    let mut form = BTreeMap::new();
    form.insert("email".to_string(), args.email.clone());
    form.insert("password".to_string(), args.password.clone());
    let form_errors = validate_form(&form, &login_rules());
    if !form_errors.is_empty() {
        for (field, field_error) in &form_errors {
            warn!(field = field.as_str(), message = field_error.message.as_str(), "invalid field");
        }
        bail!("sign-in form is invalid");
    }

    let identity = store.login(&args.email, &args.password).await?;
    info!(user_id = %identity.id, name = identity.name.as_str(), "authenticated");

    let state = store.state().await;
    info!(
        path = interview_path.as_str(),
        decision = ?guard.decide(&interview_path, &state),
        "post-login navigation"
    );

    let session_length = args
        .session_length
        .unwrap_or(settings.session_length_seconds);
    let controller = InterviewController::with_session_length(
        InterviewId::new(args.interview_id.clone()),
        Arc::new(LoopbackMediaDevices),
        session_length,
    );
    controller.start().await?;
    let snapshot = controller.snapshot().await;
    info!(
        remaining = format_remaining(snapshot.remaining_seconds).as_str(),
        urgency = ?urgency(snapshot.remaining_seconds),
        "live session running"
    );
    controller.toggle_mute().await?;
    controller.toggle_mute().await?;
    controller.end().await?;
    info!(phase = ?controller.phase().await, "moved to the assessment");

    let mut engine = QuestionnaireEngine::new(
        InterviewId::new(args.interview_id),
        sample_questions(),
    );
    for question in engine.questions().to_vec() {
        match question {
            Question::Text { id, .. } => {
                engine.set_answer(
                    &id,
                    AnswerInput::Text("Covered during the live interview.".to_string()),
                )?;
            }
            Question::SingleChoice { id, correct, .. } => {
                engine.set_answer(&id, AnswerInput::Choice(correct.unwrap_or(0)))?;
            }
            Question::MultiChoice { id, correct, .. } => {
                let selections = correct.unwrap_or_else(|| BTreeSet::from([0]));
                for index in selections {
                    engine.set_answer(&id, AnswerInput::ToggleSelection(index))?;
                }
            }
        }
    }

    let sink = SimulatedSubmissionSink::with_round_trip(Duration::from_millis(
        settings.submit_round_trip_ms,
    ));
    let record = engine.submit(&sink).await?.clone();
    let tally = score(&record, engine.questions());
    info!(
        submitted_at = %record.submitted_at,
        correct = tally.correct,
        scorable = tally.scorable,
        "assessment submitted"
    );

    store.logout().await;
    Ok(())
}

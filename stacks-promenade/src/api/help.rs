//! Reference appointment scheduling page

use axum::{
    extract::State,
    routing::get,
    Form, Json, Router,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use stacks_common::db::settings::{self, keys::scheduling};
use stacks_common::db::ScheduleRequestSubject;
use stacks_common::web::markdown_to_html;
use tracing::{info, warn};

use super::Language;
use crate::error::ApiResult;
use crate::services::schedule_service::{validate_request, FieldErrors};
use crate::services::ScheduleForm;
use crate::AppState;

/// Rendered segment shown above the form or confirmation
#[derive(Debug, Clone, Serialize)]
pub struct SegmentBlock {
    pub header: Option<String>,
    pub html: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "view")]
pub enum ScheduleViewModel {
    NoSchedule {
        segment: Option<SegmentBlock>,
    },
    Form {
        segment: Option<SegmentBlock>,
        first_available: NaiveDateTime,
        subjects: Vec<ScheduleRequestSubject>,
        form: ScheduleForm,
        errors: FieldErrors,
    },
    Scheduled {
        segment: Option<SegmentBlock>,
        subject: String,
        requested_time: NaiveDateTime,
    },
}

async fn segment_block(
    state: &AppState,
    setting_key: &str,
    language: Option<&str>,
) -> ApiResult<Option<SegmentBlock>> {
    let segment_id = settings::get_setting_int(&state.db, setting_key, -1).await?;
    if segment_id <= 0 {
        return Ok(None);
    }

    let text = state
        .segments
        .get_segment_text_by_segment_id(segment_id, language, false)
        .await?;

    Ok(text.map(|text| SegmentBlock {
        header: text.header,
        html: markdown_to_html(text.text.as_deref().unwrap_or_default()),
    }))
}

/// Subjects when scheduling is available, otherwise the NoSchedule view
async fn available_subjects(
    state: &AppState,
    language: Option<&str>,
) -> ApiResult<Result<Vec<ScheduleRequestSubject>, ScheduleViewModel>> {
    let enabled = settings::get_setting_bool(&state.db, scheduling::ENABLE, false).await?;

    let subjects = if enabled {
        let subjects = state.schedule.get_subjects().await?;
        if subjects.is_empty() {
            warn!("Scheduling is enabled but there are no active subjects");
        }
        subjects
    } else {
        Vec::new()
    };

    if subjects.is_empty() {
        let segment = segment_block(state, scheduling::DISABLED_SEGMENT, language).await?;
        return Ok(Err(ScheduleViewModel::NoSchedule { segment }));
    }

    Ok(Ok(subjects))
}

/// GET /Help/Schedule
pub async fn schedule(
    State(state): State<AppState>,
    language: Language,
) -> ApiResult<Json<ScheduleViewModel>> {
    let subjects = match available_subjects(&state, language.as_deref()).await? {
        Ok(subjects) => subjects,
        Err(view) => return Ok(Json(view)),
    };

    let first_available = state.schedule.first_available();
    let form = ScheduleForm {
        requested_date: Some(first_available.date()),
        requested_time: Some(first_available.time()),
        ..Default::default()
    };

    Ok(Json(ScheduleViewModel::Form {
        segment: segment_block(&state, scheduling::ENABLED_SEGMENT, language.as_deref()).await?,
        first_available,
        subjects,
        form,
        errors: FieldErrors::new(),
    }))
}

/// POST /Help/Schedule
pub async fn submit(
    State(state): State<AppState>,
    language: Language,
    Form(mut form): Form<ScheduleForm>,
) -> ApiResult<Json<ScheduleViewModel>> {
    let subjects = match available_subjects(&state, language.as_deref()).await? {
        Ok(subjects) => subjects,
        Err(view) => return Ok(Json(view)),
    };

    let first_available = state.schedule.first_available();
    let errors = validate_request(&mut form, first_available, &subjects);

    if !errors.is_empty() {
        info!(error_count = errors.len(), "Schedule request failed validation");
        return Ok(Json(ScheduleViewModel::Form {
            segment: segment_block(&state, scheduling::ENABLED_SEGMENT, language.as_deref())
                .await?,
            first_available,
            subjects,
            form,
            errors,
        }));
    }

    let request = state.schedule.add(&form, language.as_deref()).await?;

    let subject = subjects
        .into_iter()
        .find(|s| s.id == request.schedule_request_subject_id)
        .map(|s| s.subject)
        .unwrap_or_default();

    Ok(Json(ScheduleViewModel::Scheduled {
        segment: segment_block(&state, scheduling::SCHEDULED_SEGMENT, language.as_deref()).await?,
        subject,
        requested_time: request.requested_time,
    }))
}

pub fn help_routes() -> Router<AppState> {
    Router::new().route("/Help/Schedule", get(schedule).post(submit))
}

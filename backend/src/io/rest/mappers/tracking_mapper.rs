use chrono::NaiveDateTime;
use shared::{DailyTrackRequest, DailyTrackResponse, QuickTrackRequest, QuickTrackResponse};

use crate::domain::commands::tracking::{DailyRecordResult, QuickTrackCommand, SubmitDailyRecordCommand};

pub struct TrackingMapper;

impl TrackingMapper {
    /// Convert a daily track request into the domain command for `student_id`
    pub fn to_submit_command(request: DailyTrackRequest, student_id: i64, now: NaiveDateTime) -> SubmitDailyRecordCommand {
        SubmitDailyRecordCommand {
            student_id,
            mood_id: request.mood_id,
            exercise_id: request.exercise_id,
            sleep_id: request.sleep_id,
            socialisation_id: request.socialisation_id,
            productivity_score: request.productivity_score,
            tag_ids: request.tag_ids,
            now,
        }
    }

    pub fn to_daily_track_response(result: DailyRecordResult) -> DailyTrackResponse {
        DailyTrackResponse {
            daily_record_id: result.daily_record_id,
            streak_value: result.streak_value,
            updated_existing: result.updated_existing,
            message: result.success_message,
        }
    }

    pub fn to_quick_track_command(request: QuickTrackRequest, student_id: i64, now: NaiveDateTime) -> QuickTrackCommand {
        QuickTrackCommand {
            student_id,
            mood_id: request.mood_id,
            now,
        }
    }

    pub fn to_quick_track_response(quick_track_id: i64) -> QuickTrackResponse {
        QuickTrackResponse {
            quick_track_id,
            message: "Mood recorded".to_string(),
        }
    }
}

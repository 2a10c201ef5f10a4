//! Lifecycle engine orchestration.
//!
//! Three automatic triggers (registration, check-in, membership conversion)
//! plus the manual archive and admin-override paths. Every stage decision
//! consults the central stage table in [`crate::pipeline::PipelineStage`];
//! nothing here re-derives ordering.

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::checkins::{
    CheckInInsert, CheckInRateLimiter, CheckInRepositoryTrait, CheckInSource, NewCheckIn,
};
use crate::errors::{Error, Result};
use crate::lifecycle::{
    AdvanceAction, AdvanceResult, ArchiveResult, CheckInResult, ConversionAction,
    ConversionResult, RegistrationAction, RegistrationResult,
};
use crate::meetings::MeetingRepositoryTrait;
use crate::participants::{Participant, ParticipantRepositoryTrait, ParticipantStatus};
use crate::payments::PaymentGateTrait;
use crate::pipeline::{
    initial_stage_for_history, NewPipelineRecord, PersonRef, PipelineInsert, PipelineRecord,
    PipelineRepositoryTrait, PipelineStage, StageChange,
};

/// Subject identity for pipeline lookups: a participant who entered the
/// funnel as a visitor matches through either pointer.
fn person_for(participant: &Participant) -> PersonRef {
    match participant.visitor_id.as_deref() {
        Some(visitor_id) => PersonRef::linked(visitor_id, &participant.id),
        None => PersonRef::participant(&participant.id),
    }
}

pub struct LifecycleService {
    participants: Arc<dyn ParticipantRepositoryTrait>,
    meetings: Arc<dyn MeetingRepositoryTrait>,
    checkins: Arc<dyn CheckInRepositoryTrait>,
    pipeline: Arc<dyn PipelineRepositoryTrait>,
    payment_gate: Arc<dyn PaymentGateTrait>,
    rate_limiter: CheckInRateLimiter,
}

impl LifecycleService {
    pub fn new(
        participants: Arc<dyn ParticipantRepositoryTrait>,
        meetings: Arc<dyn MeetingRepositoryTrait>,
        checkins: Arc<dyn CheckInRepositoryTrait>,
        pipeline: Arc<dyn PipelineRepositoryTrait>,
        payment_gate: Arc<dyn PaymentGateTrait>,
    ) -> Self {
        Self {
            participants,
            meetings,
            checkins,
            pipeline,
            payment_gate,
            rate_limiter: CheckInRateLimiter::new(),
        }
    }

    /// Overrides the default attempt limiter, mainly for tests.
    pub fn with_rate_limiter(mut self, rate_limiter: CheckInRateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Registration trigger: a visitor registers for a meeting.
    ///
    /// Creating a record late backfills the starting stage from the person's
    /// historical check-in count, so pipeline tracking enabled after the fact
    /// does not misrepresent an established visitor as a brand-new lead.
    pub async fn on_visitor_registered(
        &self,
        tenant_id: &str,
        person: &PersonRef,
        meeting_id: &str,
        source: &str,
        referrer: Option<&str>,
    ) -> Result<RegistrationResult> {
        person.person_key()?;
        self.meetings.get(tenant_id, meeting_id).await?;

        if let Some(record) = self.pipeline.find_active_by_person(tenant_id, person).await? {
            return self
                .register_against_existing(tenant_id, record, meeting_id)
                .await;
        }

        let prior_checkins = match person.participant_id.as_deref() {
            Some(participant_id) => {
                self.checkins
                    .count_for_participant(tenant_id, participant_id)
                    .await?
            }
            None => 0,
        };
        let initial_stage = initial_stage_for_history(prior_checkins);

        let insert = self
            .pipeline
            .insert_active(NewPipelineRecord {
                tenant_id: tenant_id.to_string(),
                person: person.clone(),
                initial_stage,
                last_meeting_id: Some(meeting_id.to_string()),
                source: Some(source.to_string()),
                referrer: referrer.map(str::to_string),
                change_reason: format!(
                    "Registration for meeting {} with {} prior check-in(s)",
                    meeting_id, prior_checkins
                ),
            })
            .await?;

        match insert {
            PipelineInsert::Created(record) => {
                info!(
                    "Created pipeline record {} at {} for tenant {}",
                    record.id, record.current_stage, tenant_id
                );
                Ok(RegistrationResult {
                    action: RegistrationAction::Created,
                    record_id: record.id,
                    from_stage: None,
                    to_stage: record.current_stage,
                })
            }
            // Lost the find-or-create race; the winner's row is authoritative.
            PipelineInsert::AlreadyActive(record) => {
                debug!(
                    "Pipeline record {} already active for person {:?}; treating as repeat registration",
                    record.id, person
                );
                self.register_against_existing(tenant_id, record, meeting_id)
                    .await
            }
        }
    }

    /// Repeat registration. The meeting pointer is refreshed regardless;
    /// a stage move to `revisit` happens only while the record is still
    /// unprotected.
    async fn register_against_existing(
        &self,
        tenant_id: &str,
        record: PipelineRecord,
        meeting_id: &str,
    ) -> Result<RegistrationResult> {
        self.pipeline
            .touch_registration(tenant_id, &record.id, meeting_id)
            .await?;

        let wants_revisit = matches!(
            record.current_stage,
            PipelineStage::Lead | PipelineStage::Attended
        );
        if wants_revisit
            && record
                .current_stage
                .allows_auto_move_to(PipelineStage::Revisit)
        {
            let updated = self
                .pipeline
                .apply_stage_change(
                    tenant_id,
                    &record.id,
                    StageChange {
                        to_stage: PipelineStage::Revisit,
                        to_sub_status: record.current_sub_status.clone(),
                        is_automatic: true,
                        change_reason: format!("Repeat registration for meeting {}", meeting_id),
                        changed_by: None,
                    },
                )
                .await?;
            return Ok(RegistrationResult {
                action: RegistrationAction::Moved,
                record_id: updated.id,
                from_stage: Some(record.current_stage),
                to_stage: updated.current_stage,
            });
        }

        Ok(RegistrationResult {
            action: RegistrationAction::Updated,
            record_id: record.id,
            from_stage: None,
            to_stage: record.current_stage,
        })
    }

    /// Check-in trigger. Idempotent under retry, payment-gated for visitors,
    /// and rate-limited per `(tenant, participant)`.
    pub async fn on_check_in(
        &self,
        tenant_id: &str,
        participant_id: &str,
        meeting_id: &str,
        source: CheckInSource,
        line_user_id: Option<&str>,
    ) -> Result<CheckInResult> {
        let participant = self.participants.get(tenant_id, participant_id).await?;
        self.meetings.get(tenant_id, meeting_id).await?;

        self.rate_limiter.check(tenant_id, participant_id)?;

        if let Some(existing) = self
            .checkins
            .find(tenant_id, participant_id, meeting_id)
            .await?
        {
            debug!(
                "Participant {} already checked in to meeting {} at {}",
                participant_id, meeting_id, existing.checkin_time
            );
            return Ok(CheckInResult::AlreadyCheckedIn {
                checkin_time: existing.checkin_time,
            });
        }

        // Best-effort platform identity bind; check-in proceeds regardless.
        if let Some(line_id) = line_user_id {
            if participant.line_user_id.is_none() {
                if let Err(err) = self
                    .participants
                    .bind_line_user_id(tenant_id, participant_id, line_id)
                    .await
                {
                    warn!(
                        "Could not bind LINE user to participant {}: {}",
                        participant_id, err
                    );
                }
            }
        }

        let effective_status = match participant.status {
            ParticipantStatus::Member => ParticipantStatus::Member,
            ParticipantStatus::Visitor => ParticipantStatus::Visitor,
            ParticipantStatus::Prospect => {
                // Irreversible by this engine; only admins may downgrade.
                self.participants
                    .update_status(
                        tenant_id,
                        participant_id,
                        ParticipantStatus::Visitor,
                        "Automatic upgrade on first check-in attempt",
                        None,
                    )
                    .await?;
                info!(
                    "Upgraded prospect {} to visitor on check-in attempt",
                    participant_id
                );
                ParticipantStatus::Visitor
            }
            other => {
                return Err(Error::InvalidStatus {
                    participant_id: participant_id.to_string(),
                    status: other.as_str().to_string(),
                })
            }
        };

        if effective_status == ParticipantStatus::Visitor {
            let policy = self.payment_gate.payment_policy(tenant_id).await?;
            if policy.requires_visitor_payment
                && !self
                    .payment_gate
                    .has_satisfied_payment(tenant_id, participant_id, meeting_id)
                    .await?
            {
                // A prospect→visitor upgrade above may already be committed
                // at this point; that is intentional.
                return Ok(CheckInResult::RequirePayment {
                    pay_url: policy.pay_url(tenant_id, participant_id, meeting_id),
                    amount: policy.visitor_fee_amount,
                    currency: policy.visitor_fee_currency,
                });
            }
        }

        let insert = self
            .checkins
            .insert(NewCheckIn {
                tenant_id: tenant_id.to_string(),
                participant_id: participant_id.to_string(),
                meeting_id: meeting_id.to_string(),
                source,
            })
            .await?;

        match insert {
            CheckInInsert::Inserted(checkin) => {
                // Attendance is the ground truth; a funnel bookkeeping
                // failure must never undo the ledger write.
                let person = person_for(&participant);
                if let Err(err) = self
                    .advance_pipeline_on_check_in(tenant_id, &person, meeting_id)
                    .await
                {
                    error!(
                        "Pipeline advance failed after check-in of participant {} to meeting {}: {}",
                        participant_id, meeting_id, err
                    );
                }
                Ok(CheckInResult::CheckedIn {
                    checkin_time: checkin.checkin_time,
                })
            }
            CheckInInsert::AlreadyExists(checkin) => Ok(CheckInResult::AlreadyCheckedIn {
                checkin_time: checkin.checkin_time,
            }),
        }
    }

    /// Pipeline-side advance after a durable check-in write. Attendance
    /// without a funnel record is valid; that case returns `Ok(None)`.
    pub async fn advance_pipeline_on_check_in(
        &self,
        tenant_id: &str,
        person: &PersonRef,
        meeting_id: &str,
    ) -> Result<Option<AdvanceResult>> {
        let Some(record) = self.pipeline.find_active_by_person(tenant_id, person).await? else {
            debug!(
                "No active pipeline record for {:?} in tenant {}; attendance recorded without funnel update",
                person, tenant_id
            );
            return Ok(None);
        };

        let meetings_attended = self
            .pipeline
            .increment_meetings_attended(tenant_id, &record.id)
            .await?;

        if record.current_stage.is_protected() {
            info!(
                "Record {} holds protected stage {}; check-in for meeting {} only bumped the counter",
                record.id, record.current_stage, meeting_id
            );
            return Ok(Some(AdvanceResult {
                action: AdvanceAction::Updated,
                from_stage: None,
                to_stage: record.current_stage,
                meetings_attended,
            }));
        }

        // This trigger only drives the two earliest moves; later stages are
        // reached via admin action or the conversion trigger.
        let next_stage = match record.current_stage {
            PipelineStage::Lead => Some(PipelineStage::Attended),
            PipelineStage::Attended if meetings_attended >= 2 => Some(PipelineStage::Revisit),
            _ => None,
        };

        let Some(to_stage) = next_stage else {
            return Ok(Some(AdvanceResult {
                action: AdvanceAction::Updated,
                from_stage: None,
                to_stage: record.current_stage,
                meetings_attended,
            }));
        };

        let updated = self
            .pipeline
            .apply_stage_change(
                tenant_id,
                &record.id,
                StageChange {
                    to_stage,
                    to_sub_status: record.current_sub_status.clone(),
                    is_automatic: true,
                    change_reason: format!(
                        "Check-in for meeting {} ({} attended)",
                        meeting_id, meetings_attended
                    ),
                    changed_by: None,
                },
            )
            .await?;

        Ok(Some(AdvanceResult {
            action: AdvanceAction::Moved,
            from_stage: Some(record.current_stage),
            to_stage: updated.current_stage,
            meetings_attended,
        }))
    }

    /// Membership conversion: an authoritative business fact that always
    /// wins. Delivered at-least-once, so a record already at `active_member`
    /// or `onboarding` is left untouched.
    pub async fn on_member_conversion(
        &self,
        tenant_id: &str,
        participant_id: &str,
        source: &str,
    ) -> Result<ConversionResult> {
        let participant = self.participants.get(tenant_id, participant_id).await?;
        if participant.status != ParticipantStatus::Member {
            self.participants
                .update_status(
                    tenant_id,
                    participant_id,
                    ParticipantStatus::Member,
                    &format!("Membership conversion via {}", source),
                    None,
                )
                .await?;
        }

        let person = person_for(&participant);
        let existing = self.pipeline.find_active_by_person(tenant_id, &person).await?;

        let record = match existing {
            Some(record) => record,
            None => {
                // Conversion can originate outside the funnel (bulk import).
                let insert = self
                    .pipeline
                    .insert_active(NewPipelineRecord {
                        tenant_id: tenant_id.to_string(),
                        person,
                        initial_stage: PipelineStage::ActiveMember,
                        last_meeting_id: None,
                        source: Some(source.to_string()),
                        referrer: None,
                        change_reason: format!("Membership conversion via {}", source),
                    })
                    .await?;
                match insert {
                    PipelineInsert::Created(record) => {
                        return Ok(ConversionResult {
                            action: ConversionAction::Created,
                            record_id: record.id,
                        })
                    }
                    PipelineInsert::AlreadyActive(record) => record,
                }
            }
        };

        if matches!(
            record.current_stage,
            PipelineStage::ActiveMember | PipelineStage::Onboarding
        ) {
            return Ok(ConversionResult {
                action: ConversionAction::Unchanged,
                record_id: record.id,
            });
        }

        if record.participant_id.is_none() {
            self.pipeline
                .attach_participant(tenant_id, &record.id, participant_id)
                .await?;
        }

        let updated = self
            .pipeline
            .apply_stage_change(
                tenant_id,
                &record.id,
                StageChange {
                    to_stage: PipelineStage::ActiveMember,
                    to_sub_status: record.current_sub_status.clone(),
                    is_automatic: true,
                    change_reason: format!("Membership conversion via {}", source),
                    changed_by: None,
                },
            )
            .await?;
        info!(
            "Conversion moved record {} from {} to {}",
            updated.id, record.current_stage, updated.current_stage
        );

        Ok(ConversionResult {
            action: ConversionAction::Moved,
            record_id: updated.id,
        })
    }

    /// Archive: the one escape hatch from the no-backward rule, permitted
    /// from any stage. "Decline" is a terminal state, not a forward one.
    pub async fn archive_record(
        &self,
        tenant_id: &str,
        record_id: &str,
        sub_status: Option<&str>,
        reason: &str,
        changed_by: &str,
    ) -> Result<ArchiveResult> {
        self.pipeline.get(tenant_id, record_id).await?;

        let updated = self
            .pipeline
            .apply_stage_change(
                tenant_id,
                record_id,
                StageChange {
                    to_stage: PipelineStage::Archived,
                    to_sub_status: Some(sub_status.unwrap_or("declined").to_string()),
                    is_automatic: false,
                    change_reason: reason.to_string(),
                    changed_by: Some(changed_by.to_string()),
                },
            )
            .await?;

        Ok(ArchiveResult {
            record_id: updated.id,
            archived_at: updated.archived_at.unwrap_or(updated.updated_at),
            archive_reason: updated.archive_reason.unwrap_or_else(|| reason.to_string()),
        })
    }

    /// Admin override: not subject to the no-backward rule, but still
    /// writes its transition row.
    pub async fn admin_stage_change(
        &self,
        tenant_id: &str,
        record_id: &str,
        to_stage: PipelineStage,
        sub_status: Option<&str>,
        reason: &str,
        changed_by: &str,
    ) -> Result<PipelineRecord> {
        self.pipeline.get(tenant_id, record_id).await?;
        self.pipeline
            .apply_stage_change(
                tenant_id,
                record_id,
                StageChange {
                    to_stage,
                    to_sub_status: sub_status.map(str::to_string),
                    is_automatic: false,
                    change_reason: reason.to_string(),
                    changed_by: Some(changed_by.to_string()),
                },
            )
            .await
    }
}

// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! The room deletion policy engine.

use ovmeet_types::rooms::{
    MeetingEndAction, RoomDeletionCode, WithMeetingPolicy, WithRecordingsPolicy,
};

/// What the deletion executor has to do for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPlan {
    /// Delete the room now (200).
    Delete {
        kick_meeting: bool,
        delete_recordings: bool,
        code: RoomDeletionCode,
    },
    /// Keep the room but close it (200, room returned).
    Close {
        kick_meeting: bool,
        code: RoomDeletionCode,
    },
    /// Defer the action until the running meeting ends (202, room
    /// returned).
    Schedule {
        action: MeetingEndAction,
        code: RoomDeletionCode,
    },
    /// Refuse the request (409).
    Refuse { code: RoomDeletionCode },
}

impl DeletionPlan {
    pub fn code(&self) -> RoomDeletionCode {
        match self {
            Self::Delete { code, .. }
            | Self::Close { code, .. }
            | Self::Schedule { code, .. }
            | Self::Refuse { code } => *code,
        }
    }
}

/// Decide what a deletion request does, from the current room state and
/// the requested policies.
pub fn decide_deletion(
    has_active_meeting: bool,
    has_recordings: bool,
    with_meeting: WithMeetingPolicy,
    with_recordings: WithRecordingsPolicy,
) -> DeletionPlan {
    use DeletionPlan::{Close, Delete, Refuse, Schedule};
    use MeetingEndAction as Action;
    use RoomDeletionCode as Code;
    use WithMeetingPolicy as M;
    use WithRecordingsPolicy as R;

    match (has_active_meeting, has_recordings, with_meeting, with_recordings) {
        (false, false, _, _) => Delete {
            kick_meeting: false,
            delete_recordings: false,
            code: Code::RoomDeleted,
        },

        (false, true, _, R::Force) => Delete {
            kick_meeting: false,
            delete_recordings: true,
            code: Code::RoomAndRecordingsDeleted,
        },
        (false, true, _, R::Close) => Close {
            kick_meeting: false,
            code: Code::RoomClosed,
        },
        (false, true, _, R::Fail) => Refuse {
            code: Code::RoomHasRecordings,
        },

        (true, false, M::Force, _) => Delete {
            kick_meeting: true,
            delete_recordings: false,
            code: Code::RoomWithActiveMeetingDeleted,
        },
        (true, false, M::WhenMeetingEnds, _) => Schedule {
            action: Action::Delete,
            code: Code::RoomScheduledToBeDeleted,
        },
        (true, false, M::Fail, _) => Refuse {
            code: Code::RoomHasActiveMeeting,
        },

        (true, true, M::Force, R::Force) => Delete {
            kick_meeting: true,
            delete_recordings: true,
            code: Code::RoomWithActiveMeetingAndRecordingsDeleted,
        },
        (true, true, M::Force, R::Close) => Close {
            kick_meeting: true,
            code: Code::RoomWithActiveMeetingClosed,
        },
        (true, true, M::Force, R::Fail) => Refuse {
            code: Code::RoomWithActiveMeetingHasRecordings,
        },
        (true, true, M::WhenMeetingEnds, R::Force) => Schedule {
            action: Action::Delete,
            code: Code::RoomAndRecordingsScheduledToBeDeleted,
        },
        (true, true, M::WhenMeetingEnds, R::Close) => Schedule {
            action: Action::Close,
            code: Code::RoomScheduledToBeClosed,
        },
        (true, true, M::WhenMeetingEnds, R::Fail) => Refuse {
            code: Code::RoomHasRecordingsCannotScheduleDeletion,
        },
        (true, true, M::Fail, _) => Refuse {
            code: Code::RoomWithRecordingsHasActiveMeeting,
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn the_decision_table_row_by_row() {
        use DeletionPlan::{Close, Delete, Refuse, Schedule};
        use MeetingEndAction as Action;
        use RoomDeletionCode as Code;
        use WithMeetingPolicy as M;
        use WithRecordingsPolicy as R;

        // (active, recs, withMeeting, withRecordings) -> expected plan
        let rows = [
            (
                (false, false, M::Fail, R::Fail),
                Delete {
                    kick_meeting: false,
                    delete_recordings: false,
                    code: Code::RoomDeleted,
                },
            ),
            (
                (false, true, M::Fail, R::Force),
                Delete {
                    kick_meeting: false,
                    delete_recordings: true,
                    code: Code::RoomAndRecordingsDeleted,
                },
            ),
            (
                (false, true, M::Fail, R::Close),
                Close {
                    kick_meeting: false,
                    code: Code::RoomClosed,
                },
            ),
            (
                (false, true, M::Fail, R::Fail),
                Refuse {
                    code: Code::RoomHasRecordings,
                },
            ),
            (
                (true, false, M::Force, R::Fail),
                Delete {
                    kick_meeting: true,
                    delete_recordings: false,
                    code: Code::RoomWithActiveMeetingDeleted,
                },
            ),
            (
                (true, false, M::WhenMeetingEnds, R::Fail),
                Schedule {
                    action: Action::Delete,
                    code: Code::RoomScheduledToBeDeleted,
                },
            ),
            (
                (true, false, M::Fail, R::Fail),
                Refuse {
                    code: Code::RoomHasActiveMeeting,
                },
            ),
            (
                (true, true, M::Force, R::Force),
                Delete {
                    kick_meeting: true,
                    delete_recordings: true,
                    code: Code::RoomWithActiveMeetingAndRecordingsDeleted,
                },
            ),
            (
                (true, true, M::Force, R::Close),
                Close {
                    kick_meeting: true,
                    code: Code::RoomWithActiveMeetingClosed,
                },
            ),
            (
                (true, true, M::Force, R::Fail),
                Refuse {
                    code: Code::RoomWithActiveMeetingHasRecordings,
                },
            ),
            (
                (true, true, M::WhenMeetingEnds, R::Force),
                Schedule {
                    action: Action::Delete,
                    code: Code::RoomAndRecordingsScheduledToBeDeleted,
                },
            ),
            (
                (true, true, M::WhenMeetingEnds, R::Close),
                Schedule {
                    action: Action::Close,
                    code: Code::RoomScheduledToBeClosed,
                },
            ),
            (
                (true, true, M::WhenMeetingEnds, R::Fail),
                Refuse {
                    code: Code::RoomHasRecordingsCannotScheduleDeletion,
                },
            ),
            (
                (true, true, M::Fail, R::Close),
                Refuse {
                    code: Code::RoomWithRecordingsHasActiveMeeting,
                },
            ),
        ];

        for ((active, recs, with_meeting, with_recordings), expected) in rows {
            assert_eq!(
                decide_deletion(active, recs, with_meeting, with_recordings),
                expected,
                "row (active={active}, recs={recs}, {with_meeting:?}, {with_recordings:?})"
            );
        }
    }

    #[test]
    fn wildcard_columns_do_not_change_the_outcome() {
        // Row 1: policies are irrelevant for an idle, recording-free room.
        for with_meeting in [
            WithMeetingPolicy::Force,
            WithMeetingPolicy::WhenMeetingEnds,
            WithMeetingPolicy::Fail,
        ] {
            for with_recordings in [
                WithRecordingsPolicy::Force,
                WithRecordingsPolicy::Close,
                WithRecordingsPolicy::Fail,
            ] {
                assert_eq!(
                    decide_deletion(false, false, with_meeting, with_recordings).code(),
                    RoomDeletionCode::RoomDeleted
                );
            }
        }

        // Row 5: recordings policy is irrelevant when no recordings exist.
        for with_recordings in [
            WithRecordingsPolicy::Force,
            WithRecordingsPolicy::Close,
            WithRecordingsPolicy::Fail,
        ] {
            assert_eq!(
                decide_deletion(true, false, WithMeetingPolicy::Force, with_recordings).code(),
                RoomDeletionCode::RoomWithActiveMeetingDeleted
            );
        }
    }
}

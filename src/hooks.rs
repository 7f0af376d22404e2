use crate::types::{Announcement, AudioCue, RuntimeEvent};

pub trait Announcer {
    fn show_message(&mut self, announcement: Announcement);

    /// Follow-up once a timed message has been on screen for its `auto_hide_ms`.
    fn hide_message(&mut self, text: &str);
}

pub trait AudioSink {
    fn play(&mut self, cue: AudioCue);
}

/// `drain` hands everything reported since the last call to the next snapshot.
pub trait EventSink: Announcer + AudioSink {
    fn push(&mut self, event: RuntimeEvent);

    fn drain(&mut self) -> Vec<RuntimeEvent>;
}

#[derive(Clone, Debug, Default)]
pub struct EventBuffer {
    events: Vec<RuntimeEvent>,
}

impl EventBuffer {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Announcer for EventBuffer {
    fn show_message(&mut self, announcement: Announcement) {
        self.events.push(RuntimeEvent::Announcement(announcement));
    }

    fn hide_message(&mut self, text: &str) {
        self.events.push(RuntimeEvent::AnnouncementHidden {
            text: text.to_string(),
        });
    }
}

impl AudioSink for EventBuffer {
    fn play(&mut self, cue: AudioCue) {
        self.events.push(RuntimeEvent::Audio { cue });
    }
}

impl EventSink for EventBuffer {
    fn push(&mut self, event: RuntimeEvent) {
        self.events.push(event);
    }

    fn drain(&mut self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut self.events)
    }
}

#[derive(Clone, Debug)]
struct HideTimer {
    text: String,
    remaining_ms: u64,
}

/// Countdowns for timed announcements. Permanent ones are never tracked.
#[derive(Clone, Debug, Default)]
pub struct HideSchedule {
    timers: Vec<HideTimer>,
}

impl HideSchedule {
    pub fn track(&mut self, announcement: &Announcement) {
        if announcement.permanent {
            return;
        }
        if let Some(remaining_ms) = announcement.auto_hide_ms {
            self.timers.push(HideTimer {
                text: announcement.text.clone(),
                remaining_ms,
            });
        }
    }

    /// Texts whose timers ran out during this `dt_ms`, in the order they were shown.
    pub fn advance(&mut self, dt_ms: u64) -> Vec<String> {
        let mut expired = Vec::new();
        self.timers.retain_mut(|timer| {
            timer.remaining_ms = timer.remaining_ms.saturating_sub(dt_ms);
            if timer.remaining_ms == 0 {
                expired.push(std::mem::take(&mut timer.text));
                return false;
            }
            true
        });
        expired
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ALERT_COLOR, LIGHT_TINT};

    fn timed(text: &str, auto_hide_ms: Option<u64>) -> Announcement {
        Announcement {
            text: text.to_string(),
            color: LIGHT_TINT,
            permanent: auto_hide_ms.is_none(),
            auto_hide_ms,
        }
    }

    #[test]
    fn hook_calls_become_drainable_events() {
        let mut buffer = EventBuffer::default();
        buffer.play(AudioCue::GhostSpawn);
        buffer.show_message(Announcement {
            text: "hello".to_string(),
            color: ALERT_COLOR,
            permanent: true,
            auto_hide_ms: None,
        });
        buffer.hide_message("hello");
        assert_eq!(buffer.len(), 3);
        let drained = buffer.drain();
        assert!(matches!(
            drained[0],
            RuntimeEvent::Audio {
                cue: AudioCue::GhostSpawn
            }
        ));
        assert!(matches!(&drained[1], RuntimeEvent::Announcement(a) if a.permanent));
        assert!(matches!(
            &drained[2],
            RuntimeEvent::AnnouncementHidden { text } if text == "hello"
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn timed_messages_expire_after_their_delay() {
        let mut schedule = HideSchedule::default();
        schedule.track(&timed("short", Some(40)));
        schedule.track(&timed("long", Some(100)));
        assert!(schedule.advance(20).is_empty());
        assert_eq!(schedule.advance(20), vec!["short".to_string()]);
        assert_eq!(schedule.len(), 1);
        assert!(schedule.advance(40).is_empty());
        assert_eq!(schedule.advance(40), vec!["long".to_string()]);
        assert!(schedule.is_empty());
    }

    #[test]
    fn permanent_messages_are_never_scheduled() {
        let mut schedule = HideSchedule::default();
        schedule.track(&timed("forever", None));
        assert!(schedule.is_empty());
        assert!(schedule.advance(u64::MAX).is_empty());
    }
}

use super::*;

impl<R: PlayerRegistry, H: EventSink> GameEngine<R, H> {
    pub(super) fn apply_hits(&mut self, hits: Vec<GhostHit>) {
        for hit in first_hit_per_player(hits) {
            if self.ended {
                break;
            }
            self.notify_player_hit(&hit.ghost_id, &hit.player_id);
        }
    }

    /// A ghost touched a player: strike, cost a life, and end the game on the last one.
    /// Reports from unknown ghosts or ghosts in their death slide are ignored.
    pub fn notify_player_hit(&mut self, ghost_id: &str, player_id: &str) -> Option<KillOutcome> {
        if self.ended {
            return None;
        }
        if !self
            .population
            .get(ghost_id)
            .is_some_and(|ghost| ghost.active)
        {
            debug!(ghost_id, player_id, "hit from inactive ghost ignored");
            return None;
        }
        let color = self.registry.color_of(player_id)?;
        self.strike();
        self.events.play(AudioCue::PlayerDeath);
        let outcome = self.registry.apply_ghost_kill(player_id)?;
        self.stats.player_deaths += 1;

        let lives_left = match outcome {
            KillOutcome::LifeLost { remaining } => remaining,
            KillOutcome::GameOver => 0,
        };
        info!(ghost_id, player_id, lives_left, "player hit by ghost");
        self.events.push(RuntimeEvent::PlayerHit {
            ghost_id: ghost_id.to_string(),
            player_id: player_id.to_string(),
            lives_left,
        });

        match outcome {
            KillOutcome::LifeLost { .. } => {
                self.announce(TEXT_PLAYER_KILLED, color, Some(ANNOUNCE_HIDE_MS));
            }
            KillOutcome::GameOver => self.game_over(GameOverReason::AllLivesLost),
        }
        Some(outcome)
    }

    /// A player's torch caught a ghost. Only the first report for a live ghost counts.
    pub fn notify_ghost_killed(
        &mut self,
        ghost_id: &str,
        by_player: Option<&str>,
        recoil_to: Option<Vec2>,
    ) -> KillAck {
        if self.ended {
            return KillAck::Ignored;
        }
        let ack = self
            .population
            .mark_killed(ghost_id, self.elapsed_ms, recoil_to);
        if ack == KillAck::Ignored {
            debug!(ghost_id, "duplicate ghost kill ignored");
            return ack;
        }

        self.strike();
        self.stats.ghosts_killed += 1;
        let mut color = LIGHT_TINT;
        if let Some(player_id) = by_player {
            self.registry.credit_ghost_kill(player_id);
            color = self.registry.color_of(player_id).unwrap_or(LIGHT_TINT);
        }
        info!(ghost_id, by = ?by_player, "ghost killed");
        self.announce(TEXT_GHOST_KILLED, color, Some(ANNOUNCE_HIDE_MS));
        self.events.play(AudioCue::GhostDeath);
        self.events.push(RuntimeEvent::GhostKilled {
            ghost_id: ghost_id.to_string(),
            by: by_player.map(str::to_string),
        });
        ack
    }

    pub(super) fn game_over(&mut self, reason: GameOverReason) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.end_reason = Some(reason);
        self.announce(TEXT_GAME_OVER, ALERT_COLOR, None);
        self.pause();
        self.interrupt_lightning();
        warn!(?reason, elapsed_ms = self.elapsed_ms, "game over");
        self.events.push(RuntimeEvent::GameOver { reason });
    }

    fn announce(&mut self, text: &str, color: Color, auto_hide_ms: Option<u64>) {
        let announcement = Announcement {
            text: text.to_string(),
            color,
            permanent: auto_hide_ms.is_none(),
            auto_hide_ms,
        };
        self.hide_schedule.track(&announcement);
        self.events.show_message(announcement);
    }

    pub(super) fn expire_announcements(&mut self, dt_ms: u64) {
        for text in self.hide_schedule.advance(dt_ms) {
            self.events.hide_message(&text);
        }
    }
}

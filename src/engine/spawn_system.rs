use super::*;

impl<R: PlayerRegistry, H: EventSink> GameEngine<R, H> {
    pub(super) fn process_due_spawns(&mut self, now_ms: u64) {
        for request in self.population.take_due(now_ms) {
            self.attempt_spawn(now_ms, request);
        }
    }

    fn attempt_spawn(&mut self, now_ms: u64, request: PendingSpawn) {
        let players = sighting_positions(&self.registry.sightings());
        match self
            .population
            .try_spawn(&self.graph, &players, &mut self.rng)
        {
            Ok((ghost_id, node)) => {
                self.stats.spawns += 1;
                info!(ghost_id = %ghost_id, %node, attempt = request.attempt, "ghost spawned");
                self.events.push(RuntimeEvent::GhostSpawned { ghost_id, node });
                self.events.play(AudioCue::GhostSpawn);
                self.strike();
            }
            Err(error) => self.defer_spawn(now_ms, request, &error),
        }
    }

    /// Retries an exhausted spawn with capped exponential backoff, then gives up.
    fn defer_spawn(&mut self, now_ms: u64, request: PendingSpawn, error: &SimError) {
        let spawn = &self.config.spawn;
        let attempts = request.attempt.saturating_add(1);
        if attempts >= spawn.max_attempts {
            self.stats.spawns_abandoned += 1;
            warn!(attempts, %error, "ghost spawn abandoned");
            self.events
                .push(RuntimeEvent::SpawnAbandoned { attempts });
            return;
        }

        let retry_in_ms =
            get_spawn_retry_delay_ms(request.attempt, spawn.retry_base_ms, spawn.retry_max_ms);
        self.population
            .schedule_attempt(now_ms, retry_in_ms, attempts);
        self.stats.spawns_deferred += 1;
        debug!(attempt = attempts, retry_in_ms, %error, "ghost spawn deferred");
        self.events.push(RuntimeEvent::SpawnDeferred {
            attempt: attempts,
            retry_in_ms,
        });
    }

    pub(super) fn record_removals(&mut self, removed: Vec<String>) {
        for ghost_id in removed {
            debug!(ghost_id = %ghost_id, "ghost removed");
            self.events.push(RuntimeEvent::GhostRemoved { ghost_id });
        }
    }
}

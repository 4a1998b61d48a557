use axum::extract::FromRef;

use crate::auth::AuthManager;
use crate::backend::Backend;
use crate::booking::BookingManager;
use crate::calendar::CalendarManager;
use crate::follow::FollowManager;
use crate::profile::ProfileManager;
use crate::timeslot::TimeslotManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedBackend = Arc<dyn Backend>;
pub type GuardedAuthManager = Arc<AuthManager>;
pub type GuardedProfileManager = Arc<ProfileManager>;
pub type GuardedTimeslotManager = Arc<TimeslotManager>;
pub type GuardedBookingManager = Arc<BookingManager>;
pub type GuardedFollowManager = Arc<FollowManager>;
pub type GuardedCalendarManager = Arc<CalendarManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub auth_manager: GuardedAuthManager,
    pub profile_manager: GuardedProfileManager,
    pub timeslot_manager: GuardedTimeslotManager,
    pub booking_manager: GuardedBookingManager,
    pub follow_manager: GuardedFollowManager,
    pub calendar_manager: GuardedCalendarManager,
}

impl ServerState {
    pub fn new(config: ServerConfig, backend: GuardedBackend, hash: String) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            hash,
            auth_manager: Arc::new(AuthManager::new(backend.clone())),
            profile_manager: Arc::new(ProfileManager::new(backend.clone())),
            timeslot_manager: Arc::new(TimeslotManager::new(backend.clone())),
            booking_manager: Arc::new(BookingManager::new(backend.clone())),
            follow_manager: Arc::new(FollowManager::new(backend.clone())),
            calendar_manager: Arc::new(CalendarManager::new(backend)),
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedAuthManager {
    fn from_ref(input: &ServerState) -> Self {
        input.auth_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedProfileManager {
    fn from_ref(input: &ServerState) -> Self {
        input.profile_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedTimeslotManager {
    fn from_ref(input: &ServerState) -> Self {
        input.timeslot_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedBookingManager {
    fn from_ref(input: &ServerState) -> Self {
        input.booking_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedFollowManager {
    fn from_ref(input: &ServerState) -> Self {
        input.follow_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedCalendarManager {
    fn from_ref(input: &ServerState) -> Self {
        input.calendar_manager.clone()
    }
}

//! The per-client permission bitmap.

use bitflags::bitflags;

bitflags! {
    /// What a connected client may ask the simulator to do.  Transmitted in
    /// the handshake response as a plain `u64`.
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct Permissions: u64 {
        const ADD_AGENT         = 1 << 0;
        const REMOVE_AGENT      = 1 << 1;
        const REMOVE_CLIENT     = 1 << 2;
        const SET_ACTIVE        = 1 << 3;
        const GET_MAP           = 1 << 4;
        const GET_AGENT_IDS     = 1 << 5;
        const GET_AGENT_STATES  = 1 << 6;
        const MANAGE_SEMAPHORES = 1 << 7;
    }
}

impl Permissions {
    /// Everything except semaphore management — a sensible default for
    /// plain RL workers.
    pub fn standard() -> Permissions {
        Permissions::all() - Permissions::MANAGE_SEMAPHORES
    }
}

impl Default for Permissions {
    fn default() -> Permissions {
        Permissions::standard()
    }
}

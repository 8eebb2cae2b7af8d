//! Operation codes.

/// Wire operation codes.  A response reuses its request's opcode; `Step` is
/// server-initiated and has no request.  Values are stable.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u64)]
pub enum Opcode {
    Handshake       = 0,
    AddAgent        = 1,
    RemoveAgent     = 2,
    Move            = 3,
    Turn            = 4,
    DoNothing       = 5,
    GetMap          = 6,
    GetAgentIds     = 7,
    GetAgentStates  = 8,
    SetActive       = 9,
    IsActive        = 10,
    AddSemaphore    = 11,
    RemoveSemaphore = 12,
    SignalSemaphore = 13,
    GetSemaphores   = 14,
    /// Server → client after every committed turn.
    Step = 15,
    /// Detach permanently: removes the client record and everything it owns.
    RemoveClient = 16,
}

impl Opcode {
    pub const ALL: [Opcode; 17] = [
        Opcode::Handshake,
        Opcode::AddAgent,
        Opcode::RemoveAgent,
        Opcode::Move,
        Opcode::Turn,
        Opcode::DoNothing,
        Opcode::GetMap,
        Opcode::GetAgentIds,
        Opcode::GetAgentStates,
        Opcode::SetActive,
        Opcode::IsActive,
        Opcode::AddSemaphore,
        Opcode::RemoveSemaphore,
        Opcode::SignalSemaphore,
        Opcode::GetSemaphores,
        Opcode::Step,
        Opcode::RemoveClient,
    ];

    pub fn from_wire(code: u64) -> Option<Opcode> {
        Opcode::ALL.into_iter().find(|&op| op as u64 == code)
    }
}

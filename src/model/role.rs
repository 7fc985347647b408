#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    Payroll = 4,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::Payroll),
            _ => None,
        }
    }

    /// Roles allowed to run syncs, edit attendance and post pay rows
    pub fn manages_attendance(&self) -> bool {
        matches!(self, Role::Admin | Role::Hr | Role::Payroll)
    }
}

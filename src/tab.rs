/// The three role-specific dashboard views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Admin,
    Worker,
    Citizen,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Admin => "admin",
            Tab::Worker => "worker",
            Tab::Citizen => "citizen",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Tab::Admin),
            "worker" => Some(Tab::Worker),
            "citizen" => Some(Tab::Citizen),
            _ => None,
        }
    }

    pub fn all() -> [Tab; 3] {
        [Tab::Admin, Tab::Worker, Tab::Citizen]
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Admin => 0,
            Tab::Worker => 1,
            Tab::Citizen => 2,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Tab::Admin => Tab::Worker,
            Tab::Worker => Tab::Citizen,
            Tab::Citizen => Tab::Admin,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Tab::Admin => Tab::Citizen,
            Tab::Worker => Tab::Admin,
            Tab::Citizen => Tab::Worker,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Tab::Admin => "Admin Console",
            Tab::Worker => "Worker App",
            Tab::Citizen => "Citizen Portal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_from_str() {
        for tab in Tab::all() {
            assert_eq!(Tab::from_str(tab.as_str()), Some(tab));
        }
        assert_eq!(Tab::from_str(" Worker "), Some(Tab::Worker));
        assert_eq!(Tab::from_str("driver"), None);
    }

    #[test]
    fn next_and_prev_cycle() {
        assert_eq!(Tab::Citizen.next(), Tab::Admin);
        assert_eq!(Tab::Admin.prev(), Tab::Citizen);
        assert_eq!(Tab::Worker.next().prev(), Tab::Worker);
    }
}

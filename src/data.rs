//! Static demo data for the dashboard views.

use ratatui::style::Color;

pub const RED: Color = Color::Rgb(239, 68, 68);
pub const BLUE: Color = Color::Rgb(59, 130, 246);
pub const GREEN: Color = Color::Rgb(34, 197, 94);
pub const ORANGE: Color = Color::Rgb(249, 115, 22);
pub const DARK_GREEN: Color = Color::Rgb(22, 101, 52);

/// (lat, lng) the admin map opens on
pub const CITY_CENTER: (f64, f64) = (28.4744, 77.5038);
pub const CITY_ZOOM: u8 = 12;

#[derive(Debug, Clone, Copy)]
pub struct Truck {
    pub id: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub status: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Deviation {
    pub id: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub truck: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Report {
    pub id: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub kind: &'static str,
}

pub const TRUCKS: &[Truck] = &[
    Truck { id: "UP78-A1234", lat: 28.484, lng: 77.513, status: "On Route" },
    Truck { id: "UP78-B5678", lat: 28.465, lng: 77.498, status: "Idle" },
];

pub const DEVIATIONS: &[Deviation] = &[
    Deviation { id: "DEV-001", lat: 28.491, lng: 77.525, truck: "UP78-A1234" },
];

pub const REPORTS: &[Report] = &[
    Report { id: "REP-001", lat: 28.470, lng: 77.530, kind: "Illegal Dumping" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    ThreeMonths,
    #[default]
    SixMonths,
    OneYear,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::ThreeMonths => "3m",
            Period::SixMonths => "6m",
            Period::OneYear => "1y",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "3m" => Some(Period::ThreeMonths),
            "6m" => Some(Period::SixMonths),
            "1y" => Some(Period::OneYear),
            _ => None,
        }
    }

    pub fn all() -> [Period; 3] {
        [Period::ThreeMonths, Period::SixMonths, Period::OneYear]
    }

    pub fn next(&self) -> Self {
        match self {
            Period::ThreeMonths => Period::SixMonths,
            Period::SixMonths => Period::OneYear,
            Period::OneYear => Period::ThreeMonths,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Period::ThreeMonths => Period::OneYear,
            Period::SixMonths => Period::ThreeMonths,
            Period::OneYear => Period::SixMonths,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::ThreeMonths => "3 Months",
            Period::SixMonths => "6 Months",
            Period::OneYear => "1 Year",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Series {
    pub label: &'static str,
    pub values: &'static [u64],
    pub color: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct Slice {
    pub label: &'static str,
    pub percent: u16,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Tons of CO2 avoided
    pub co2: u64,
    /// Energy recovered from biogas/RDF
    pub kwh: u64,
    pub deviations: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct PeriodData {
    pub labels: &'static [&'static str],
    /// Landfill, recycling, biogas/RDF tonnage per label
    pub diversion: [Series; 3],
    pub composition: [Slice; 3],
    /// Citizen tickets reported vs resolved
    pub reports: [Series; 2],
    /// Ward scores on the `PERFORMANCE_AXES`
    pub performance: [Series; 2],
    pub stats: Stats,
}

pub const PERFORMANCE_AXES: [&str; 5] = [
    "Collection %",
    "On-Time %",
    "Diversion %",
    "Low Complaints",
    "Efficiency",
];

static THREE_MONTHS: PeriodData = PeriodData {
    labels: &["Jun", "Jul", "Aug"],
    diversion: [
        Series { label: "Landfill", values: &[120, 110, 115], color: RED },
        Series { label: "Recycling", values: &[40, 45, 50], color: BLUE },
        Series { label: "Biogas/RDF", values: &[30, 35, 40], color: GREEN },
    ],
    composition: [
        Slice { label: "Recycling", percent: 26, color: BLUE },
        Slice { label: "Biogas/RDF", percent: 21, color: GREEN },
        Slice { label: "Landfill", percent: 53, color: RED },
    ],
    reports: [
        Series { label: "Reported", values: &[45, 60, 55], color: ORANGE },
        Series { label: "Resolved", values: &[40, 52, 54], color: DARK_GREEN },
    ],
    performance: [
        Series { label: "Ward A", values: &[95, 85, 70, 75, 80], color: BLUE },
        Series { label: "Ward B", values: &[88, 92, 65, 80, 85], color: GREEN },
    ],
    stats: Stats { co2: 1450, kwh: 89300, deviations: 12 },
};

static SIX_MONTHS: PeriodData = PeriodData {
    labels: &["Mar", "Apr", "May", "Jun", "Jul", "Aug"],
    diversion: [
        Series { label: "Landfill", values: &[150, 140, 130, 120, 110, 115], color: RED },
        Series { label: "Recycling", values: &[30, 35, 38, 40, 45, 50], color: BLUE },
        Series { label: "Biogas/RDF", values: &[20, 22, 28, 30, 35, 40], color: GREEN },
    ],
    composition: [
        Slice { label: "Recycling", percent: 23, color: BLUE },
        Slice { label: "Biogas/RDF", percent: 17, color: GREEN },
        Slice { label: "Landfill", percent: 60, color: RED },
    ],
    reports: [
        Series { label: "Reported", values: &[50, 55, 52, 45, 60, 55], color: ORANGE },
        Series { label: "Resolved", values: &[48, 53, 50, 40, 52, 54], color: DARK_GREEN },
    ],
    performance: [
        Series { label: "Ward A", values: &[92, 88, 68, 72, 81], color: BLUE },
        Series { label: "Ward B", values: &[85, 90, 68, 82, 86], color: GREEN },
    ],
    stats: Stats { co2: 2980, kwh: 185400, deviations: 25 },
};

static ONE_YEAR: PeriodData = PeriodData {
    labels: &["Sep", "Nov", "Jan", "Mar", "May", "Jul"],
    diversion: [
        Series { label: "Landfill", values: &[180, 175, 160, 150, 130, 110], color: RED },
        Series { label: "Recycling", values: &[20, 25, 28, 30, 38, 45], color: BLUE },
        Series { label: "Biogas/RDF", values: &[10, 12, 15, 20, 28, 35], color: GREEN },
    ],
    composition: [
        Slice { label: "Recycling", percent: 18, color: BLUE },
        Slice { label: "Biogas/RDF", percent: 12, color: GREEN },
        Slice { label: "Landfill", percent: 70, color: RED },
    ],
    reports: [
        Series { label: "Reported", values: &[60, 65, 70, 50, 52, 60], color: ORANGE },
        Series { label: "Resolved", values: &[58, 62, 68, 48, 50, 58], color: DARK_GREEN },
    ],
    performance: [
        Series { label: "Ward A", values: &[90, 85, 65, 70, 78], color: BLUE },
        Series { label: "Ward B", values: &[88, 88, 70, 85, 88], color: GREEN },
    ],
    stats: Stats { co2: 6100, kwh: 395000, deviations: 58 },
};

pub fn period_data(period: Period) -> &'static PeriodData {
    match period {
        Period::ThreeMonths => &THREE_MONTHS,
        Period::SixMonths => &SIX_MONTHS,
        Period::OneYear => &ONE_YEAR,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    InProgress,
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Pending => "Pending",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            TaskStatus::InProgress => Color::Blue,
            TaskStatus::Pending => Color::Yellow,
            TaskStatus::Completed => Color::Green,
        }
    }

    /// Label of the detail-view button, if the status has one
    pub fn action_label(&self) -> Option<&'static str> {
        match self {
            TaskStatus::Pending => Some("Start Task"),
            TaskStatus::InProgress => Some("Mark as Complete"),
            TaskStatus::Completed => None,
        }
    }

    pub fn advanced(&self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Pending => Some(TaskStatus::InProgress),
            TaskStatus::InProgress => Some(TaskStatus::Completed),
            TaskStatus::Completed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Route,
    Pickup,
    Ticket,
    Maintenance,
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Route => "route",
            TaskKind::Pickup => "pickup",
            TaskKind::Ticket => "ticket",
            TaskKind::Maintenance => "maintenance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapFocus {
    pub center: (f64, f64),
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: u32,
    pub title: &'static str,
    pub status: TaskStatus,
    pub description: &'static str,
    pub kind: TaskKind,
    pub map: Option<MapFocus>,
}

pub fn worker_tasks() -> Vec<Task> {
    vec![
        Task {
            id: 1,
            title: "Morning Route - Ward 12B",
            status: TaskStatus::InProgress,
            description: "Standard morning collection route for all designated bins in Ward 12B. Ensure segregation at source is maintained.",
            kind: TaskKind::Route,
            map: Some(MapFocus { center: (28.4744, 77.5038), zoom: 14 }),
        },
        Task {
            id: 2,
            title: "Bulk Pickup - Central Market",
            status: TaskStatus::Pending,
            description: "Collect large volume organic waste from Central Market vendor area. Vehicle: UP78-C9012.",
            kind: TaskKind::Pickup,
            map: Some(MapFocus { center: (28.465, 77.498), zoom: 16 }),
        },
        Task {
            id: 3,
            title: "Resolve Ticket #TKT-0905-003",
            status: TaskStatus::Pending,
            description: "Citizen report of overflowing bin near Jagat Farm. Photo proof of resolution required.",
            kind: TaskKind::Ticket,
            map: Some(MapFocus { center: (28.484, 77.513), zoom: 17 }),
        },
        Task {
            id: 4,
            title: "Vehicle Maintenance Check",
            status: TaskStatus::Completed,
            description: "Daily pre-shift vehicle inspection completed and logged.",
            kind: TaskKind::Maintenance,
            map: None,
        },
    ]
}

/// Citizen impact figures, animated into view the first time the tab opens
pub const CITIZEN_STATS: &[(&str, u64)] = &[
    ("Green Points", 1250),
    ("Reports Filed", 14),
    ("Kg Segregated", 326),
];

pub const REWARDS: &[(&str, u64)] = &[
    ("Compost starter kit", 400),
    ("Reusable shopping bag set", 600),
    ("Municipal tax rebate voucher", 1500),
];

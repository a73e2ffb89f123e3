use escrow_client::Role;

/// One entry of the role-scoped navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub route: &'static str,
}

const fn item(label: &'static str, route: &'static str) -> NavItem {
    NavItem { label, route }
}

const BASE: [NavItem; 4] = [
    item("Dashboard", "/dashboard"),
    item("Projects", "/projects"),
    item("Notifications", "/notifications"),
    item("Profile", "/profile"),
];

const ADMIN: [NavItem; 4] = [
    item("Companies", "/admin/companies"),
    item("Escrow", "/admin/escrow"),
    item("Disputes", "/admin/disputes"),
    item("Platform Settings", "/admin/settings"),
];

const COMPANY: [NavItem; 1] = [item("Company Profile", "/company/profile")];

/// Navigation shown to `role`: the base set plus the role's own entries.
///
/// An unresolved role gets the base set only.
pub fn navigation_for(role: Role) -> Vec<NavItem> {
    let extra: &[NavItem] = match role {
        Role::Admin => &ADMIN,
        Role::Company => &COMPANY,
        Role::Client | Role::Unresolved => &[],
    };
    BASE.iter().chain(extra).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(role: Role) -> Vec<&'static str> {
        navigation_for(role).iter().map(|i| i.label).collect()
    }

    const ADMIN_ONLY: [&str; 4] = ["Companies", "Escrow", "Disputes", "Platform Settings"];

    #[test]
    fn admin_sees_back_office() {
        let labels = labels(Role::Admin);
        assert_eq!(&labels[..4], ["Dashboard", "Projects", "Notifications", "Profile"]);
        for label in ADMIN_ONLY {
            assert!(labels.contains(&label), "missing {label}");
        }
    }

    #[test]
    fn client_sees_base_only() {
        let labels = labels(Role::Client);
        assert_eq!(labels.len(), 4);
        for label in ADMIN_ONLY {
            assert!(!labels.contains(&label), "unexpected {label}");
        }
    }

    #[test]
    fn company_gets_company_profile() {
        let labels = labels(Role::Company);
        assert!(labels.contains(&"Company Profile"));
        assert!(!labels.contains(&"Disputes"));
    }

    #[test]
    fn unresolved_matches_client() {
        assert_eq!(navigation_for(Role::Unresolved), navigation_for(Role::Client));
    }
}

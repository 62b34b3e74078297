/// Selectors for the account login form
pub mod login {
    pub const USERNAME_INPUT: &str = "#_username";

    pub const PASSWORD_INPUT: &str = "#_password";

    pub const SUBMIT_BUTTON: &str = "#submit-login";

    /// Only shown for accounts with two-factor authentication
    pub const ONE_TIME_CODE_INPUT: &str = "#input-verify-code";

    pub const VERIFY_BUTTON: &str = "#btn-submit";
}

/// Selectors for the usage page
pub mod usage {
    pub const TABLE: &str = ".usage-table";

    /// Relative to [`TABLE`]
    pub const ROWS: &str = "tbody tr";

    /// Relative to a row
    pub const PROJECT_NAME: &str = ".usage-table__project-name";

    /// Relative to a row
    pub const PROJECT_TOTAL: &str = ".usage-table__col-total";
}

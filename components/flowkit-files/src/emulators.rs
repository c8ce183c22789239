pub const DEFAULT_EMULATOR_NAME: &str = "default";
pub const DEFAULT_EMULATOR_PORT: u16 = 3569;
pub const DEFAULT_SERVICE_ACCOUNT: &str = "emulator-account";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emulator {
    pub name: String,
    pub port: u16,
    pub service_account: String,
}

impl Default for Emulator {
    fn default() -> Self {
        Emulator {
            name: DEFAULT_EMULATOR_NAME.to_string(),
            port: DEFAULT_EMULATOR_PORT,
            service_account: DEFAULT_SERVICE_ACCOUNT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emulators(Vec<Emulator>);
impl_named_collection!(Emulators, Emulator, "emulator");

impl Emulators {
    pub fn default_emulators() -> Emulators {
        Emulators(vec![Emulator::default()])
    }

    pub fn default_emulator(&self) -> Option<&Emulator> {
        self.by_name(DEFAULT_EMULATOR_NAME).ok()
    }

    /// Only the default emulator is configured.
    pub fn is_default(&self) -> bool {
        self.0.len() == 1 && self.0[0] == Emulator::default()
    }
}

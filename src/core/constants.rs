pub mod programs {
    pub const SYSTEM: &str = "11111111111111111111111111111111";
    pub const COMPUTE_BUDGET: &str = "ComputeBudget111111111111111111111111111111";
    pub const TOKEN: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    pub const TOKEN_2022: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
    pub const ASSOCIATED_TOKEN: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";
}

/// Programs never reported as "program calls" in activity descriptions.
pub const NATIVE_PROGRAMS: &[&str] = &[
    programs::SYSTEM,
    programs::COMPUTE_BUDGET,
    programs::TOKEN,
    programs::TOKEN_2022,
    programs::ASSOCIATED_TOKEN,
];

pub const TOKEN_PROGRAMS: &[&str] = &[programs::TOKEN, programs::TOKEN_2022];

/// Decimal places of the native currency (lamports per SOL = 10^9).
pub const NATIVE_SCALE: u8 = 9;
pub const NATIVE_SYMBOL: &str = "SOL";

/// SPL token account layout: mint | owner | amount (u64 LE) | ...
pub mod token_account_layout {
    pub const MINT_OFFSET: usize = 0;
    pub const OWNER_OFFSET: usize = 32;
    pub const AMOUNT_OFFSET: usize = 64;
    pub const MIN_LEN: usize = 72;
}

/// SPL mint layout: mint_authority (COption<Pubkey>) | supply (u64 LE) | decimals | is_initialized
pub mod mint_layout {
    pub const SUPPLY_OFFSET: usize = 36;
    pub const DECIMALS_OFFSET: usize = 44;
    pub const IS_INITIALIZED_OFFSET: usize = 45;
    pub const MIN_LEN: usize = 46;
}

pub const ADDRESS_LEN: usize = 32;

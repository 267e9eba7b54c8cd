use color_eyre::eyre::Result;

/// Line-oriented user interaction: progress output, free-text answers and yes/no decisions.
#[cfg_attr(test, mockall::automock)]
pub trait Console {
    fn line(&self, text: &str);

    fn ask(&self, prompt: &str) -> Result<String>;

    /// `Ok(true)` only for an explicit yes.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

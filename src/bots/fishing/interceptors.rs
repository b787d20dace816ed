use crate::device::{Frame, MouseButton};
use crate::game_automation::{BotContext, BotResult, Interceptor};

/// Confirm button of the server connection dialog, relative to the capture region
const CONFIRM_BUTTON: (i32, i32) = (1100, 795);

/// Dismisses the "connect to server" dialog whatever state the bot is in
pub struct ReconnectDialog;

impl Interceptor for ReconnectDialog {
    fn name(&self) -> &str {
        "reconnect"
    }

    fn check(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> bool {
        ctx.find(frame, "connect_server", 5).is_some()
    }

    fn execute(&mut self, _frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<()> {
        let (x, y) = ctx.absolute(CONFIRM_BUTTON.0, CONFIRM_BUTTON.1);

        ctx.input.move_to(x, y)?;
        ctx.pause(0.5);
        ctx.input.move_to(x, y)?;
        ctx.pause(0.5);
        ctx.input.click(MouseButton::Left, 1, 0.0)?;
        ctx.pause(1.0);

        log::info!("✅ Confirmed server connection");
        Ok(())
    }
}

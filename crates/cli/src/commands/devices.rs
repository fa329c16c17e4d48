use crown::SessionController;

use crate::backend::RestSessionClient;
use crate::error::Result;

pub async fn execute(backend: RestSessionClient, email: &str, password: &str) -> Result<()> {
    let controller = SessionController::new(backend);
    controller.login(email, password).await?;

    let devices = controller.list_devices().await?;
    if devices.is_empty() {
        println!("no devices registered to this account");
    } else {
        for device in &devices {
            println!("{}  {}", device.device_id, device.device_nickname);
        }
    }

    controller.logout().await?;
    Ok(())
}

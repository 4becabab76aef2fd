// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use ovmeet_controller_core::Controller;
use snafu::Whatever;

#[actix_web::main]
async fn main() {
    ovmeet_controller_core::try_or_exit(run()).await;
}

async fn run() -> Result<(), Whatever> {
    if let Some(controller) = Controller::create("OvMeet Controller").await? {
        controller.run().await?;
    }

    Ok(())
}

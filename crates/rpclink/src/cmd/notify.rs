use rpclink_client::ClientConfig;

use crate::cmd::session::Session;
use crate::cmd::{parse_duration, parse_params, require_method, runtime, NotifyArgs};
use crate::exit::{client_error, lost_error, CliResult, SUCCESS};

pub fn run(args: NotifyArgs, token: Option<String>) -> CliResult<i32> {
    require_method(&args.method)?;
    let params = parse_params(args.params.as_deref())?;
    let timeout = parse_duration(&args.timeout)?;

    let mut config = ClientConfig::default();
    config.token = token;

    runtime()?.block_on(async move {
        let mut session = Session::connect(&args.endpoint, config)?;
        let log = session.log();
        session.client.notify(&args.method, params);

        session
            .drive(Some(timeout), |client| {
                (client.is_open() && client.queued_sends() == 0)
                    || log.first_loss().is_some()
                    || log.first_fatal_error().is_some()
            })
            .await?;

        if let Some(err) = log.first_fatal_error() {
            return Err(client_error("notify failed", &err));
        }
        if let Some(reason) = log.first_loss() {
            return Err(lost_error(reason.as_deref()));
        }
        session.shutdown().await;
        Ok(SUCCESS)
    })
}

use std::cell::RefCell;
use std::rc::Rc;

use rpclink_client::{CallResult, ClientConfig};

use crate::cmd::session::Session;
use crate::cmd::{parse_duration, parse_params, require_method, runtime, CallArgs};
use crate::exit::{client_error, lost_error, remote_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_result, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat, token: Option<String>) -> CliResult<i32> {
    require_method(&args.method)?;
    let params = parse_params(args.params.as_deref())?;
    let timeout = parse_duration(&args.timeout)?;

    let mut config = ClientConfig::default();
    config.token = token;

    runtime()?.block_on(async move {
        let mut session = Session::connect(&args.endpoint, config)?;
        let log = session.log();

        let reply: Rc<RefCell<Option<CallResult>>> = Rc::new(RefCell::new(None));
        let sink = reply.clone();
        let id = session.client.call(&args.method, params, move |outcome| {
            *sink.borrow_mut() = Some(outcome);
        });

        session
            .drive(Some(timeout), |_| {
                reply.borrow().is_some()
                    || log.first_loss().is_some()
                    || log.first_fatal_error().is_some()
            })
            .await
            .map_err(|err| CliError::new(err.code, format!("no reply to {}: {err}", args.method)))?;

        let outcome = reply.borrow_mut().take();
        match outcome {
            Some(Ok(result)) => {
                print_result(&args.method, id.as_str(), &result, format);
                session.shutdown().await;
                Ok(SUCCESS)
            }
            Some(Err(err)) => Err(remote_error("call failed", &err)),
            None => {
                if let Some(err) = log.first_fatal_error() {
                    return Err(client_error("call failed", &err));
                }
                match log.first_loss() {
                    Some(reason) => Err(lost_error(reason.as_deref())),
                    None => Err(CliError::new(INTERNAL, "client stopped without a reply")),
                }
            }
        }
    })
}

use std::{
    error::Error,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use serde_json::json;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wrapp_wiring::{
    value_map, Class, Container, ContainerConfig, Instance, InvocationError, Registry, Value,
};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .with(fmt::layer())
        .init();

    let mut container = Container::builder(Arc::new(registry()))
        .components(value_map(json!({
            "transport": {
                "class": "SmtpTransport",
                "arguments": ["%smtp.host", "%smtp.port"],
            },
            "mailer": {
                "factory": "Mailer::create",
                "arguments": ["@transport"],
                "properties": {"sender": "%mail.sender"},
                "methods": [
                    {"method": "add_header", "arguments": ["X-Mailer", "@@wrapp"]},
                ],
            },
            "mail": {"alias": "mailer"},
            "message": {"class": "Message", "scope": "prototype"},
        })))
        .params(value_map(json!({
            "smtp.host": "localhost",
            "smtp.port": 2525,
            "mail.sender": "noreply@example.org",
        })))
        .config(ContainerConfig::strict())
        .build();

    container.validate()?;
    println!("{:?}", container);

    let mailer = container.require::<Mailer>("mail")?;
    println!("{:?}", mailer);

    for _ in 0..2 {
        let message = container.require::<Message>("message")?;
        println!("{}", mailer.send(&message));
    }

    println!("{:?}", container);
    Ok(())
}

fn registry() -> Registry {
    Registry::new()
        .class(Class::new("SmtpTransport", |args| {
            Ok(SmtpTransport {
                host: args.string(0)?,
                port: u16::try_from(args.int(1)?).map_err(InvocationError::failed)?,
            })
        }))
        .class(
            Class::<Mailer>::new("Mailer", |args| {
                Ok(Mailer::new(args.instance::<SmtpTransport>(0)?))
            })
            .static_method("create", |args| {
                let transport = args.instance::<SmtpTransport>(0)?;
                Ok(Value::Instance(Instance::new(Mailer::new(transport))))
            })
            .property("sender", |mailer, value| {
                mailer.sender = value.as_str().unwrap_or_default().to_string();
                Ok(())
            })
            .method_mut("add_header", |mailer, args| {
                mailer.headers.push((args.string(0)?, args.string(1)?));
                Ok(Value::Null)
            }),
        )
        .class(Class::<Message>::with_default("Message"))
}

#[derive(Debug)]
struct SmtpTransport {
    host: String,
    port: u16,
}

#[derive(Debug)]
struct Mailer {
    transport: Arc<SmtpTransport>,
    sender: String,
    headers: Vec<(String, String)>,
    sent: AtomicU32,
}

impl Mailer {
    fn new(transport: Arc<SmtpTransport>) -> Self {
        Self {
            transport,
            sender: String::new(),
            headers: Vec::new(),
            sent: AtomicU32::new(0),
        }
    }

    fn send(&self, message: &Message) -> String {
        let count = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        format!(
            "#{count} from {} via {}:{} (message {:p}, headers {:?})",
            self.sender, self.transport.host, self.transport.port, message, self.headers
        )
    }
}

#[derive(Debug, Default)]
struct Message;

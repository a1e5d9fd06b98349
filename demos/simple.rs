use std::{sync::Arc, time::SystemTime};

use hanami_di::*;

// Define regular traits and implementor structs

trait Logger: Send + Sync {
    fn log(&self, content: &str);
}

trait DateLogger: Send + Sync {
    fn log_date(&self);
}

trait Audit: Send + Sync {
    fn record(&self, event: &str);
}

struct StdoutLogger {
    prefix: String,
}

impl Logger for StdoutLogger {
    fn log(&self, content: &str) {
        println!("{}{}", self.prefix, content);
    }
}

struct DateLoggerImpl {
    logger: Arc<dyn Logger>,
    audit: Option<Deferred<dyn Audit>>,
}

impl DateLogger for DateLoggerImpl {
    fn log_date(&self) {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.logger.log(&format!("{}s since epoch", secs));

        // The audit trail needs a date logger itself: it is only built when first used
        if let Some(audit) = &self.audit {
            match audit.get() {
                Ok(audit) => audit.record("date logged"),
                Err(err) => self.logger.log(&format!("no audit: {err}")),
            }
        }
    }
}

struct AuditImpl {
    _dates: Arc<dyn DateLogger>,
    logger: Arc<dyn Logger>,
}

impl Audit for AuditImpl {
    fn record(&self, event: &str) {
        self.logger.log(&format!("audit: {event}"));
    }
}

implements!(DateLoggerImpl => dyn DateLogger);
implements!(AuditImpl => dyn Audit);

fn main() -> Result<()> {
    let mut config = ContextConfig::new();

    config.bind_instance::<dyn Logger>(Arc::new(StdoutLogger {
        prefix: String::new(),
    }));
    config.bind_instance_qualified::<dyn Logger>(
        Arc::new(StdoutLogger {
            prefix: "[audit] ".to_string(),
        }),
        &[Qualifier::named("audit")],
    )?;

    // Constructor injection of the logger, field injection of the deferred audit trail
    config.bind::<dyn DateLogger, _>(
        ClassDecl::new()
            .constructor(ConstructorDecl::inject(
                vec![Param::of::<Arc<dyn Logger>>()],
                |args| {
                    Ok(DateLoggerImpl {
                        logger: args.next()?,
                        audit: None,
                    })
                },
            ))
            .field(FieldDecl::inject(
                "audit",
                |target: &mut DateLoggerImpl, audit: Deferred<dyn Audit>| {
                    target.audit = Some(audit)
                },
            )),
    )?;

    config.bind::<dyn Audit, _>(ClassDecl::new().constructor(ConstructorDecl::inject(
        vec![
            Param::of::<Arc<dyn DateLogger>>(),
            Param::qualified::<Arc<dyn Logger>>(Qualifier::named("audit")),
        ],
        |args| {
            Ok(AuditImpl {
                _dates: args.next()?,
                logger: args.next()?,
            })
        },
    )))?;

    let context = config.get_context()?;
    println!("{context:?}");

    let logger = context
        .get(&ComponentRef::<Arc<dyn DateLogger>>::of())?
        .ok_or(WiringError::Unbound {
            component: Key::of::<dyn DateLogger>(),
        })?;
    logger.log_date();

    Ok(())
}

//! Per-user proxy operations on top of the proxy store.

use std::{sync::Arc, time::Duration};

use crate::{
    domain::{ProxyId, UserId},
    errors::Error,
    proxy::{self, ProxyDescriptor},
    store::{NewProxy, Proxy, ProxyStore},
    utils::{AuditEvent, AuditLogger},
    Result,
};

const MAX_NAME_LEN: usize = 64;

#[derive(Clone)]
pub struct ProxyService {
    store: Arc<dyn ProxyStore>,
    audit: Option<AuditLogger>,
    test_timeout: Duration,
}

impl ProxyService {
    pub fn new(store: Arc<dyn ProxyStore>, audit: Option<AuditLogger>, test_timeout: Duration) -> Self {
        Self {
            store,
            audit,
            test_timeout,
        }
    }

    pub fn list(&self, owner: UserId) -> Result<Vec<Proxy>> {
        self.store.list_proxies(owner)
    }

    pub fn get(&self, owner: UserId, id: ProxyId) -> Result<Proxy> {
        self.store
            .get_proxy(owner, id)?
            .ok_or_else(|| Error::NotFound(format!("proxy {id} not found")))
    }

    /// Add from free-form chat input: either a proxy string, or a name on the
    /// first line followed by the proxy string.
    pub fn add_from_input(&self, owner: UserId, input: &str) -> Result<Proxy> {
        let (name, descriptor) = parse_named_input(input)?;
        self.add(owner, descriptor, name)
    }

    pub fn add(
        &self,
        owner: UserId,
        descriptor: ProxyDescriptor,
        name: Option<String>,
    ) -> Result<Proxy> {
        descriptor.validate()?;
        let masked = descriptor.masked();
        let id = self.store.insert_proxy(NewProxy {
            owner,
            descriptor,
            name,
        })?;
        tracing::info!(owner = owner.0, proxy_id = id.0, proxy = %masked, "proxy added");
        self.audit(AuditEvent::proxy("proxy_added", owner, id, &masked));
        self.get(owner, id)
    }

    pub fn delete(&self, owner: UserId, id: ProxyId) -> Result<()> {
        let proxy = self.get(owner, id)?;
        if !self.store.deactivate_proxy(owner, id)? {
            return Err(Error::NotFound(format!("proxy {id} not found")));
        }
        tracing::info!(owner = owner.0, proxy_id = id.0, "proxy deleted");
        self.audit(AuditEvent::proxy(
            "proxy_deleted",
            owner,
            id,
            &proxy.descriptor.masked(),
        ));
        Ok(())
    }

    /// Probe the proxy against the Telegram API. Returns the round-trip time.
    pub async fn test(&self, owner: UserId, id: ProxyId) -> Result<Duration> {
        let proxy = self.get(owner, id)?;
        let result = proxy::test_connectivity(&proxy.descriptor, self.test_timeout).await;
        match &result {
            Ok(latency) => tracing::info!(
                proxy_id = id.0,
                latency_ms = latency.as_millis() as u64,
                "proxy test succeeded"
            ),
            Err(e) => tracing::warn!(proxy_id = id.0, error = %e, "proxy test failed"),
        }
        let mut event = AuditEvent::proxy("proxy_tested", owner, id, &proxy.descriptor.masked());
        if let Err(e) = &result {
            event.error = Some(e.to_string());
        }
        self.audit(event);
        result
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(log) = &self.audit {
            log.record(event);
        }
    }
}

fn parse_named_input(input: &str) -> Result<(Option<String>, ProxyDescriptor)> {
    let lines: Vec<&str> = input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let (name, spec) = match lines.as_slice() {
        [spec] => (None, *spec),
        [name, spec] => (Some(name.chars().take(MAX_NAME_LEN).collect()), *spec),
        _ => {
            return Err(Error::InvalidFormat(
                "send the proxy on one line, optionally preceded by a name".to_string(),
            ))
        }
    };
    let descriptor = proxy::parse_proxy_string(spec)
        .ok_or_else(|| Error::InvalidFormat(format!("could not parse proxy: {spec}")))?;
    Ok((name, descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;

    fn service() -> ProxyService {
        ProxyService::new(
            Arc::new(FileStore::in_memory()),
            None,
            Duration::from_millis(10),
        )
    }

    #[test]
    fn add_with_and_without_name() {
        let svc = service();
        let p = svc.add_from_input(UserId(1), "10.0.0.1:1080").unwrap();
        assert_eq!(p.name, None);
        assert_eq!(p.descriptor.port, 1080);

        let p = svc
            .add_from_input(UserId(1), "office\nsocks5://u:p@proxy.example.com:1080")
            .unwrap();
        assert_eq!(p.name.as_deref(), Some("office"));
        assert!(p.descriptor.is_authenticated());
        assert_eq!(svc.list(UserId(1)).unwrap().len(), 2);
    }

    #[test]
    fn bad_input_is_rejected() {
        let svc = service();
        assert!(matches!(
            svc.add_from_input(UserId(1), "nonsense").unwrap_err(),
            Error::InvalidFormat(_)
        ));
        assert!(matches!(
            svc.add_from_input(UserId(1), "a\nb\nc").unwrap_err(),
            Error::InvalidFormat(_)
        ));
        assert!(matches!(
            svc.add_from_input(UserId(1), "999.0.0.1:1080").unwrap_err(),
            Error::Validation(_)
        ));
        assert!(svc.list(UserId(1)).unwrap().is_empty());
    }

    #[test]
    fn delete_is_owner_scoped() {
        let svc = service();
        let p = svc.add_from_input(UserId(1), "10.0.0.1:1080").unwrap();
        assert!(svc.delete(UserId(2), p.id).is_err());
        svc.delete(UserId(1), p.id).unwrap();
        assert!(svc.list(UserId(1)).unwrap().is_empty());
        assert!(svc.get(UserId(1), p.id).is_err());
    }
}

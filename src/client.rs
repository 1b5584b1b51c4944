use crate::config::Config;
use crate::feed::{FeedAssembler, LoadOutcome};
use crate::gateway::RelayGateway;
use crate::relay::RelayConnector;
use crate::relay_set::InvalidRelay;
use crate::signer::Signer;
use crate::whitelist::{FetchError, HttpFetcher, WellKnownFetcher, WhitelistDirectory};
use crate::RelaySet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// wires the whitelist, the relays and the feed together for one site
pub struct FestivalClient {
    config: Arc<Config>,
    whitelist: Arc<WhitelistDirectory>,
    relay_set: Arc<RelaySet>,
    gateway: RelayGateway,
    feed: Arc<FeedAssembler>,
}

impl FestivalClient {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn WellKnownFetcher>,
        connector: Arc<dyn RelayConnector>,
        signer: Option<Arc<dyn Signer>>,
    ) -> Self {
        let config = Arc::new(config);
        let whitelist = Arc::new(WhitelistDirectory::new(
            fetcher,
            config.site.domain.clone(),
        ));
        let relay_set = Arc::new(RelaySet::new(
            config.default_relays.clone(),
            config.preset_relays.clone(),
        ));
        let gateway = RelayGateway::new(
            connector,
            relay_set.clone(),
            config.readiness_policy(),
            config.relay_timeout(),
        );
        let feed = Arc::new(FeedAssembler::new(
            config.clone(),
            whitelist.clone(),
            gateway.clone(),
            signer,
        ));

        Self {
            config,
            whitelist,
            relay_set,
            gateway,
            feed,
        }
    }

    /// same as `new` but fetches the well-known document from the configured domain
    pub fn with_http(
        config: Config,
        connector: Arc<dyn RelayConnector>,
        signer: Option<Arc<dyn Signer>>,
    ) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(config.whitelist_url(), config.relay_timeout())?;
        Ok(Self::new(config, Arc::new(fetcher), connector, signer))
    }

    /// load the whitelist and connect the relays side by side, then load the feed once
    pub async fn start(&self) -> LoadOutcome {
        tokio::join!(self.whitelist.load(), self.gateway.connect_relay_set());
        log::info!(
            "started with {} whitelisted users and {} relays",
            self.whitelist.len(),
            self.gateway.connected_count()
        );
        self.feed.load_feed().await
    }

    /// reload the feed every `refresh_interval_secs` until the handle is aborted
    pub fn spawn_auto_refresh(&self) -> JoinHandle<()> {
        let feed = self.feed.clone();
        let period = self.config.refresh_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick fires right away and `start` already loaded
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let LoadOutcome::Skipped = feed.load_feed().await {
                    log::debug!("auto refresh skipped, a load is still running");
                }
            }
        })
    }

    /// add a relay to the next fan-outs, `None` drops the previous pick
    pub fn select_relay(&self, url: Option<&str>) -> Result<(), InvalidRelay> {
        match url {
            Some(url) => self.relay_set.select(url)?,
            None => self.relay_set.clear_selection(),
        }
        log::info!("now reading from {:?}", self.relay_set.endpoints());
        Ok(())
    }

    /// flips to `true` once the initial connection round is over
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.gateway.subscribe_ready()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn whitelist(&self) -> &Arc<WhitelistDirectory> {
        &self.whitelist
    }

    pub fn relay_set(&self) -> &Arc<RelaySet> {
        &self.relay_set
    }

    pub fn gateway(&self) -> &RelayGateway {
        &self.gateway
    }

    pub fn feed(&self) -> &Arc<FeedAssembler> {
        &self.feed
    }
}

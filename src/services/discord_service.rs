//! services/discord_service.rs
//! Adaptador de Discord (serenity): traduce los eventos del gateway al
//! pipeline de reenvío y expone el directorio de servidores y el envío.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client as HttpClient, Url};
use serenity::all::{
    Cache, ChannelId, ChannelType, Client, Context, CreateAttachment, CreateMessage,
    EventHandler, GatewayIntents, GuildId, Http, Message, Ready,
};
use tokio::sync::OnceCell;

use crate::models::relay_model::{ChannelRef, InboundMessage, OutboundMessage, ServerInfo};
use crate::services::capabilities::{MessageSender, ServerDirectory};
use crate::services::relay_service::RelayService;

/// Servidores del cache del bot; los canales se piden por HTTP.
pub struct DiscordDirectory {
    cache: Arc<Cache>,
    http: Arc<Http>,
}

impl DiscordDirectory {
    pub fn new(ctx: &Context) -> Self {
        Self {
            cache: ctx.cache.clone(),
            http: ctx.http.clone(),
        }
    }
}

fn cached_guild_name(cache: &Cache, guild_id: GuildId) -> String {
    cache
        .guild(guild_id)
        .map(|g| g.name.clone())
        .unwrap_or_else(|| guild_id.to_string())
}

#[async_trait]
impl ServerDirectory for DiscordDirectory {
    async fn servers(&self) -> Vec<ServerInfo> {
        let mut servers = Vec::new();
        for guild_id in self.cache.guilds() {
            let guild_name = cached_guild_name(&self.cache, guild_id);
            // El orden de los canales es el que entrega la API (no es estable).
            match guild_id.channels(&self.http).await {
                Ok(channels) => servers.push(ServerInfo {
                    guild_id: guild_id.to_string(),
                    guild_name,
                    text_channels: channels
                        .into_values()
                        .filter(|c| c.kind == ChannelType::Text)
                        .map(|c| ChannelRef::new(c.id.to_string(), c.name))
                        .collect(),
                }),
                Err(e) => {
                    log::warn!(
                        "(servers) No se pudieron listar los canales de {}: {}",
                        guild_name,
                        e
                    );
                }
            }
        }
        servers
    }
}

/// Adjuntos de un mensaje, descargados una sola vez (una por URL distinta)
/// y compartidos entre todos los destinos del despacho.
pub struct PreparedAttachments {
    files: HashMap<String, Result<CreateAttachment, String>>,
}

impl PreparedAttachments {
    pub async fn fetch<F, Fut>(urls: &[String], fetch_one: F) -> Self
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Vec<u8>>>,
    {
        let mut unique: Vec<&String> = Vec::with_capacity(urls.len());
        for url in urls {
            if !unique.contains(&url) {
                unique.push(url);
            }
        }

        let downloads = unique.into_iter().map(|url| {
            let pending = fetch_one(url.clone());
            async move {
                let outcome = pending
                    .await
                    .map(|bytes| CreateAttachment::bytes(bytes, attachment_filename(url)))
                    .map_err(|e| {
                        log::warn!("(attachments) No se pudo descargar {}: {:#}", url, e);
                        format!("{e:#}")
                    });
                (url.clone(), outcome)
            }
        });

        Self {
            files: join_all(downloads).await.into_iter().collect(),
        }
    }

    /// Archivos para las URLs dadas, en orden. Falla si alguno no se pudo
    /// descargar o no estaba entre los preparados.
    pub fn files_for(&self, urls: &[String]) -> Result<Vec<CreateAttachment>> {
        urls.iter()
            .map(|url| match self.files.get(url) {
                Some(Ok(file)) => Ok(file.clone()),
                Some(Err(reason)) => Err(anyhow!("No se pudo descargar el adjunto {url}: {reason}")),
                None => Err(anyhow!("Adjunto no preparado: {url}")),
            })
            .collect()
    }
}

async fn download(client: HttpClient, url: String) -> Result<Vec<u8>> {
    let bytes = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("No se pudo descargar el adjunto {url}"))?
        .error_for_status()
        .with_context(|| format!("Descarga del adjunto {url} falló"))?
        .bytes()
        .await
        .with_context(|| format!("No se pudo leer el adjunto {url}"))?;
    Ok(bytes.to_vec())
}

/// Envía un mensaje a canales por id. Se crea uno por mensaje observado:
/// los adjuntos se descargan en el primer envío y se reutilizan en el resto.
pub struct DiscordSender {
    http: Arc<Http>,
    downloader: HttpClient,
    attachments: OnceCell<PreparedAttachments>,
}

impl DiscordSender {
    pub fn new(http: Arc<Http>, downloader: HttpClient) -> Self {
        Self {
            http,
            downloader,
            attachments: OnceCell::new(),
        }
    }

    async fn files_for(&self, urls: &[String]) -> Result<Vec<CreateAttachment>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        let prepared = self
            .attachments
            .get_or_init(|| {
                PreparedAttachments::fetch(urls, |url| download(self.downloader.clone(), url))
            })
            .await;
        prepared.files_for(urls)
    }
}

/// Último segmento del path de la URL, o "attachment" si no hay.
pub fn attachment_filename(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "attachment".to_string())
}

#[async_trait]
impl MessageSender for DiscordSender {
    async fn send(&self, channel_id: &str, message: &OutboundMessage) -> Result<()> {
        let raw: u64 = channel_id
            .parse()
            .with_context(|| format!("Id de canal inválido: {channel_id}"))?;
        if raw == 0 {
            return Err(anyhow!("Id de canal inválido: 0"));
        }

        let files = self.files_for(&message.attachment_urls).await?;

        let mut builder = CreateMessage::new().add_files(files);
        if !message.content.is_empty() {
            builder = builder.content(message.content.clone());
        }

        ChannelId::new(raw)
            .send_message(&self.http, builder)
            .await
            .context("Discord rechazó el mensaje")?;
        Ok(())
    }
}

/// Handler de eventos del gateway.
pub struct RelayHandler {
    relay: RelayService,
    downloader: HttpClient,
}

impl RelayHandler {
    pub fn new(relay: RelayService) -> Self {
        Self {
            relay,
            downloader: HttpClient::new(),
        }
    }

    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }
}

async fn inbound_from_message(ctx: &Context, msg: &Message) -> Option<InboundMessage> {
    // Mensajes directos: no hay servidor, no aplican.
    let guild_id = msg.guild_id?;
    let channel = match msg.channel(ctx).await {
        Ok(channel) => channel.guild()?,
        Err(e) => {
            log::warn!(
                "(message) No se pudo obtener el canal {}: {}",
                msg.channel_id,
                e
            );
            return None;
        }
    };

    Some(InboundMessage {
        is_bot: msg.author.bot,
        guild_id: guild_id.to_string(),
        guild_name: cached_guild_name(&ctx.cache, guild_id),
        channel: ChannelRef::new(channel.id.to_string(), channel.name),
        author_tag: msg.author.tag(),
        content: msg.content.clone(),
        attachment_urls: msg.attachments.iter().map(|a| a.url.clone()).collect(),
    })
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        log::info!(
            "Conectado como {} ({} servidores)",
            ready.user.tag(),
            ready.guilds.len()
        );
    }

    /// Con el cache completo se loguea el inventario de canales de cada servidor.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        log::info!("El bot está en {} servidores:", guilds.len());
        for server in DiscordDirectory::new(&ctx).servers().await {
            log::info!(
                " - {} ({} canales de texto):",
                server.guild_name,
                server.text_channels.len()
            );
            for channel in &server.text_channels {
                log::info!("     #{}", channel.name);
            }
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(event) = inbound_from_message(&ctx, &msg).await else {
            return;
        };

        let directory = DiscordDirectory::new(&ctx);
        let sender = DiscordSender::new(ctx.http.clone(), self.downloader.clone());
        if let Err(e) = self.relay.process(&event, &directory, &sender).await {
            log::error!(
                "(message) Falló el relay del mensaje {} en #{}: {:?}",
                msg.id,
                event.channel.name,
                e
            );
        }
    }
}

/// Conecta el bot y bloquea mientras dure la sesión del gateway.
pub async fn run_bot(token: &str, relay: RelayService) -> Result<()> {
    let mut client = Client::builder(token, RelayHandler::intents())
        .event_handler(RelayHandler::new(relay))
        .await
        .context("No se pudo crear el cliente de Discord")?;

    client
        .start()
        .await
        .context("Login falló. Asegúrate de usar un token de BOT, no un Bearer de OAuth2")?;
    Ok(())
}

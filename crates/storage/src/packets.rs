//! Network packet operations

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::{QueryBuilder, Row};

use diag_protocol::NetworkPacket;

use crate::error::Result;
use crate::store::PgStore;

/// Hard cap on rows returned by a single history query
const MAX_PACKET_ROWS: i64 = 1_000;

/// Aggregated view of a packet time range
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkMetrics {
    pub packet_count: i64,
    pub total_bytes: i64,
    pub avg_packet_size: f64,
    pub unique_sources: i64,
    pub unique_destinations: i64,
    /// Packet count per protocol
    pub protocols: HashMap<String, i64>,
    /// The newest packets in the range, capped at 1,000
    pub packets: Vec<NetworkPacket>,
}

impl PgStore {
    /// Bulk append packets, one round trip
    pub async fn insert_packets(&self, packets: &[NetworkPacket]) -> Result<()> {
        if packets.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO network_packets \
             (time, protocol, src_ip, dst_ip, src_port, dst_port, length, payload_size, tcp_flags) ",
        );
        builder.push_values(packets, |mut row, packet| {
            row.push_bind(packet.timestamp)
                .push_bind(&packet.protocol)
                .push_bind(&packet.src_ip)
                .push_bind(&packet.dst_ip)
                .push_bind(packet.src_port)
                .push_bind(packet.dst_port)
                .push_bind(packet.length)
                .push_bind(packet.payload_size)
                .push_bind(&packet.tcp_flags);
        });

        builder.build().execute(self.pool()).await?;
        Ok(())
    }

    /// Newest packets in a range, optionally filtered by protocol
    pub async fn packets_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        protocols: Option<&[String]>,
    ) -> Result<Vec<NetworkPacket>> {
        let rows = sqlx::query(
            "SELECT time, protocol, src_ip, dst_ip, src_port, dst_port, \
                    length, payload_size, tcp_flags \
             FROM network_packets \
             WHERE time BETWEEN $1 AND $2 \
               AND ($3::text[] IS NULL OR protocol = ANY($3)) \
             ORDER BY time DESC \
             LIMIT $4",
        )
        .bind(start)
        .bind(end)
        .bind(protocols)
        .bind(MAX_PACKET_ROWS)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(read_packet).collect()
    }

    /// Range aggregates plus the newest packets, for the metrics API
    pub async fn network_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        protocols: Option<&[String]>,
    ) -> Result<NetworkMetrics> {
        let totals = sqlx::query(
            "SELECT COUNT(*) AS packet_count, \
                    COALESCE(SUM(length), 0)::BIGINT AS total_bytes, \
                    COALESCE(AVG(length), 0)::FLOAT8 AS avg_packet_size, \
                    COUNT(DISTINCT src_ip) AS unique_sources, \
                    COUNT(DISTINCT dst_ip) AS unique_destinations \
             FROM network_packets \
             WHERE time BETWEEN $1 AND $2 \
               AND ($3::text[] IS NULL OR protocol = ANY($3))",
        )
        .bind(start)
        .bind(end)
        .bind(protocols)
        .fetch_one(self.pool())
        .await?;

        let by_protocol = sqlx::query(
            "SELECT protocol, COUNT(*) AS packet_count \
             FROM network_packets \
             WHERE time BETWEEN $1 AND $2 \
               AND ($3::text[] IS NULL OR protocol = ANY($3)) \
             GROUP BY protocol",
        )
        .bind(start)
        .bind(end)
        .bind(protocols)
        .fetch_all(self.pool())
        .await?;

        let mut metrics = NetworkMetrics {
            packet_count: totals.try_get("packet_count")?,
            total_bytes: totals.try_get("total_bytes")?,
            avg_packet_size: totals.try_get("avg_packet_size")?,
            unique_sources: totals.try_get("unique_sources")?,
            unique_destinations: totals.try_get("unique_destinations")?,
            protocols: HashMap::with_capacity(by_protocol.len()),
            packets: Vec::new(),
        };
        for row in &by_protocol {
            metrics
                .protocols
                .insert(row.try_get("protocol")?, row.try_get("packet_count")?);
        }

        metrics.packets = self.packets_range(start, end, protocols).await?;
        Ok(metrics)
    }
}

fn read_packet(row: &PgRow) -> Result<NetworkPacket> {
    Ok(NetworkPacket {
        timestamp: row.try_get("time")?,
        protocol: row.try_get("protocol")?,
        src_ip: row.try_get("src_ip")?,
        dst_ip: row.try_get("dst_ip")?,
        src_port: row.try_get("src_port")?,
        dst_port: row.try_get("dst_port")?,
        length: row.try_get("length")?,
        payload_size: row.try_get("payload_size")?,
        tcp_flags: row.try_get("tcp_flags")?,
    })
}

#[cfg(test)]
#[path = "packets_test.rs"]
mod tests;
